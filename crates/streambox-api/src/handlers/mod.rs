pub mod batch_upload;
pub mod video_get;
pub mod video_upload;
