use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no frames recorded")]
    Empty,

    #[error("image encoding: {0}")]
    Image(#[from] image::ImageError),

    #[error("writing animation: {0}")]
    Io(#[from] std::io::Error),
}
