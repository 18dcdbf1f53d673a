mod api_key;

pub use api_key::{API_KEY_HEADER, MISSING_API_KEY_MESSAGE, api_key_middleware};
