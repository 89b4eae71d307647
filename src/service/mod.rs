// Service layer
//
// Business operations behind the HTTP surface. `ImageService` owns the
// owner-scoped CRUD operations and delegates transforms to the
// `TransformOrchestrator`, which sequences fetch, pipeline, store and delete.

pub mod images;
pub mod transform;

pub use images::ImageService;
pub use transform::{TransformOrchestrator, TransformOutcome};
