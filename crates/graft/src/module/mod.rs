mod image;
mod section;

pub use image::ModuleImage;
pub use section::{SectionKind, SectionRange, SectionTable};

#[cfg(target_os = "windows")]
pub use image::loaded_module_base;
