pub mod base64;
pub mod file;
pub mod ini_reader;
pub mod matcher;
pub mod string;
pub mod url;
pub mod yaml;

pub use base64::{base64_decode, base64_encode, url_safe_base64_decode, url_safe_base64_encode};
pub use file::{file_exists, file_get};
pub use ini_reader::IniReader;
pub use matcher::reg_find;
pub use string::{ends_with, replace_all_distinct, starts_with, to_lower, trim, trim_whitespace};
pub use url::{url_decode, url_encode};
pub use yaml::YamlNode;
