
mod image_file;

pub use self::image_file::ImageFile;
