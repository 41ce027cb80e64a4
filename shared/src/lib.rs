pub mod model;
pub mod upload;
pub mod workflow;

pub use model::{
    CreatePredictionRequest, ErrorResponse, Prediction, PredictionStatus, UploadRequest,
    UploadedFile,
};
