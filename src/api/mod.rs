pub mod jito;
pub mod pumpfun;

pub use jito::{BundleRelay, JitoClient};
pub use pumpfun::{IpfsMetadataUploader, MetadataUploader};
