// Image Hub processing library
// Upload keys carry the processing parameters; the object-created handler
// decodes them, transforms the image and stores the derivative.

pub mod config;
pub mod error;
pub mod handler; // Object-created handler
pub mod history;
pub mod image_optimizer;
pub mod keys; // Storage key codec
pub mod logging;
pub mod pipeline; // Decode → resize → watermark → encode
pub mod storage;
pub mod upload;
pub mod watermark;
