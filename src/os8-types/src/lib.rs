mod metadata;
mod openshift;
mod resource;

pub mod options;

pub use self::metadata::*;
pub use self::openshift::*;
pub use self::resource::*;
