pub mod detection;
pub mod providers;
pub mod recipe;
pub mod uploads;

pub use detection::{DetectionResult, FoodClassifier, ObjectDetector};
pub use recipe::{MarkerRecipeParser, RecipeGenerator, RecipeParser, RecipeResult};
pub use uploads::{is_allowed_file, secure_filename, TempUpload};
