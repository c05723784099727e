//! Recipe generation on top of a text provider.

use super::providers::{GenerationParams, TextProvider};
use metrics::counter;
use std::sync::Arc;

pub const GENERATOR_UNAVAILABLE: &str = "LLM model not available.";
pub const CONFIGURE_API_KEY: &str = "Please configure the GOOGLE_API_KEY.";
pub const NO_RECIPE_CONTENT: &str = "Could not retrieve detailed recipe information.";
pub const UNSEPARATED_INSTRUCTIONS: &str = "Could not separate recipe and instructions.";
pub const GENERATION_FAILED: &str = "Error generating recipe.";

const INGREDIENTS_MARKER: &str = "Ingredients:";
const INSTRUCTIONS_MARKER: &str = "Instructions:";

/// Builds the prompt sent to the text model for `food_name`.
pub fn recipe_prompt(food_name: &str) -> String {
    format!(
        "Provide a detailed recipe and step-by-step cooking instructions for '{food_name}'.\n\
         Structure the output clearly. For example:\n\
         Recipe for {food_name}:\n\
         Ingredients:\n\
         - Ingredient 1\n\
         - Ingredient 2\n\
         Instructions:\n\
         1. Step 1\n\
         2. Step 2\n"
    )
}

/// A recipe as delivered to the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeResult {
    /// The generated text was split at its section markers.
    Sectioned {
        ingredients: String,
        instructions: String,
    },
    /// Placeholder or unsplit text, returned as-is.
    Fallback { recipe: String, instructions: String },
}

impl RecipeResult {
    pub fn fallback(recipe: impl Into<String>, instructions: impl Into<String>) -> Self {
        RecipeResult::Fallback {
            recipe: recipe.into(),
            instructions: instructions.into(),
        }
    }

    /// The `(recipe, instructions)` pair as it appears in the response body.
    ///
    /// Sectioned recipes get their section labels back.
    pub fn into_response_parts(self) -> (String, String) {
        match self {
            RecipeResult::Sectioned {
                ingredients,
                instructions,
            } => (
                format!("{INGREDIENTS_MARKER}\n{ingredients}"),
                format!("{INSTRUCTIONS_MARKER}\n{instructions}"),
            ),
            RecipeResult::Fallback {
                recipe,
                instructions,
            } => (recipe, instructions),
        }
    }

    pub fn is_sectioned(&self) -> bool {
        matches!(self, RecipeResult::Sectioned { .. })
    }
}

/// Turns raw generated text into a recipe.
pub trait RecipeParser: Send + Sync {
    fn parse(&self, text: &str) -> RecipeResult;
}

/// Splits on the `Ingredients:` / `Instructions:` markers.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkerRecipeParser;

impl RecipeParser for MarkerRecipeParser {
    fn parse(&self, text: &str) -> RecipeResult {
        if !text.contains(INGREDIENTS_MARKER) {
            return RecipeResult::fallback(text, UNSEPARATED_INSTRUCTIONS);
        }

        match text.split_once(INSTRUCTIONS_MARKER) {
            Some((before, after)) => RecipeResult::Sectioned {
                ingredients: before.replace(INGREDIENTS_MARKER, "").trim().to_string(),
                instructions: after.trim().to_string(),
            },
            None => RecipeResult::fallback(text, UNSEPARATED_INSTRUCTIONS),
        }
    }
}

/// Recipe adapter shared by all requests.
#[derive(Clone)]
pub struct RecipeGenerator {
    provider: Option<Arc<dyn TextProvider>>,
    parser: Arc<dyn RecipeParser>,
    params: GenerationParams,
}

impl RecipeGenerator {
    pub fn new(provider: Arc<dyn TextProvider>, params: GenerationParams) -> Self {
        Self {
            provider: Some(provider),
            parser: Arc::new(MarkerRecipeParser),
            params,
        }
    }

    /// A generator with no configured model.
    pub fn unavailable() -> Self {
        Self {
            provider: None,
            parser: Arc::new(MarkerRecipeParser),
            params: GenerationParams::default(),
        }
    }

    pub fn with_parser(mut self, parser: Arc<dyn RecipeParser>) -> Self {
        self.parser = parser;
        self
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    /// Produces a recipe for `food_name`. Never fails; problems become placeholder text.
    pub async fn generate(&self, food_name: &str) -> RecipeResult {
        let Some(provider) = &self.provider else {
            tracing::warn!("Gemini model not available (API key missing or configuration error).");
            counter!("recipe_generations_total", "outcome" => "unavailable").increment(1);
            return RecipeResult::fallback(GENERATOR_UNAVAILABLE, CONFIGURE_API_KEY);
        };

        let prompt = recipe_prompt(food_name);

        match provider.generate(&prompt, &self.params).await {
            Ok(response) => {
                tracing::info!(
                    food_name,
                    input_tokens = response.input_tokens,
                    output_tokens = response.output_tokens,
                    "Recipe generated"
                );

                let text = response
                    .text
                    .unwrap_or_else(|| NO_RECIPE_CONTENT.to_string());
                let result = self.parser.parse(&text);

                let outcome = if result.is_sectioned() {
                    "sectioned"
                } else {
                    "unsectioned"
                };
                counter!("recipe_generations_total", "outcome" => outcome).increment(1);

                result
            }
            Err(e) => {
                tracing::error!(error = %e, food_name, "Error generating recipe with LLM");
                counter!("recipe_generations_total", "outcome" => "error").increment(1);
                RecipeResult::fallback(GENERATION_FAILED, e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::providers::mock::MockTextProvider;
    use crate::services::providers::ProviderError;

    #[test]
    fn split_keeps_sections_apart() {
        let result = MarkerRecipeParser.parse("Ingredients:\n- egg\nInstructions:\n1. cook.");

        let RecipeResult::Sectioned {
            ingredients,
            instructions,
        } = result
        else {
            panic!("expected a sectioned recipe");
        };

        assert_eq!(ingredients, "- egg");
        assert_eq!(instructions, "1. cook.");
        assert!(!ingredients.contains("cook"));
        assert!(!instructions.contains("egg"));
    }

    #[test]
    fn sectioned_parts_get_labels_back() {
        let (recipe, instructions) = MarkerRecipeParser
            .parse("Recipe for egg:\nIngredients:\n- egg\nInstructions:\n1. cook.")
            .into_response_parts();

        assert_eq!(recipe, "Ingredients:\nRecipe for egg:\n\n- egg");
        assert_eq!(instructions, "Instructions:\n1. cook.");
        assert_eq!(recipe.matches("egg").count(), 2);
        assert_eq!(instructions.matches("1. cook.").count(), 1);
    }

    #[test]
    fn missing_instructions_marker_falls_back() {
        let text = "Ingredients:\n- flour\n- water";

        assert_eq!(
            MarkerRecipeParser.parse(text),
            RecipeResult::fallback(text, UNSEPARATED_INSTRUCTIONS)
        );
    }

    #[test]
    fn missing_ingredients_marker_falls_back() {
        let text = "Just boil it.\nInstructions:\n1. boil";

        assert_eq!(
            MarkerRecipeParser.parse(text),
            RecipeResult::fallback(text, UNSEPARATED_INSTRUCTIONS)
        );
    }

    #[test]
    fn split_happens_at_first_instructions_marker() {
        let result =
            MarkerRecipeParser.parse("Ingredients: salt\nInstructions: a\nInstructions: b");

        assert_eq!(
            result,
            RecipeResult::Sectioned {
                ingredients: "salt".into(),
                instructions: "a\nInstructions: b".into(),
            }
        );
    }

    #[test]
    fn prompt_embeds_food_name() {
        let prompt = recipe_prompt("hot dog");

        assert!(prompt.contains("instructions for 'hot dog'"));
        assert!(prompt.contains("Recipe for hot dog:"));
        assert_eq!(prompt, recipe_prompt("hot dog"));
    }

    #[tokio::test]
    async fn unavailable_generator_returns_placeholders() {
        let result = RecipeGenerator::unavailable().generate("pizza").await;

        assert_eq!(
            result,
            RecipeResult::fallback(GENERATOR_UNAVAILABLE, CONFIGURE_API_KEY)
        );
    }

    #[tokio::test]
    async fn provider_called_once_with_prompt() {
        let provider = Arc::new(MockTextProvider::with_text(
            "Ingredients:\n- egg\nInstructions:\n1. cook.",
        ));
        let generator = RecipeGenerator::new(provider.clone(), GenerationParams::default());

        let (recipe, instructions) = generator.generate("egg").await.into_response_parts();

        assert_eq!(provider.call_count(), 1);
        assert_eq!(provider.prompts(), vec![recipe_prompt("egg")]);
        assert_eq!(recipe, "Ingredients:\n- egg");
        assert_eq!(instructions, "Instructions:\n1. cook.");
    }

    #[tokio::test]
    async fn empty_response_uses_no_content_text() {
        let generator =
            RecipeGenerator::new(Arc::new(MockTextProvider::empty()), GenerationParams::default());

        assert_eq!(
            generator.generate("cake").await,
            RecipeResult::fallback(NO_RECIPE_CONTENT, UNSEPARATED_INSTRUCTIONS)
        );
    }

    #[tokio::test]
    async fn provider_error_becomes_pair() {
        let generator = RecipeGenerator::new(
            Arc::new(MockTextProvider::failing(ProviderError::RateLimited)),
            GenerationParams::default(),
        );

        assert_eq!(
            generator.generate("cake").await,
            RecipeResult::fallback(GENERATION_FAILED, "Rate limited")
        );
    }

    #[tokio::test]
    async fn custom_parser_replaces_marker_split() {
        struct Whole;
        impl RecipeParser for Whole {
            fn parse(&self, text: &str) -> RecipeResult {
                RecipeResult::fallback(text, "")
            }
        }

        let generator = RecipeGenerator::new(
            Arc::new(MockTextProvider::with_text("Ingredients: a\nInstructions: b")),
            GenerationParams::default(),
        )
        .with_parser(Arc::new(Whole));

        assert_eq!(
            generator.generate("soup").await,
            RecipeResult::fallback("Ingredients: a\nInstructions: b", "")
        );
    }
}
