//! 请求描述：Endpoint、参数编码器与响应解析器。
//!
//! Request description.
//!
//! An [`Endpoint`] names one remote operation together with everything needed
//! to build and interpret it: parameters, headers, the [`BodyEncoding`] used to
//! serialize parameters, and the [`ResponseParser`] used on the reply.

pub mod encoding;
pub mod endpoint;
pub mod parser;

pub use encoding::{JsonEncoded, RequestEncoder, UrlEncoded};
pub use endpoint::{BodyEncoding, CachePolicy, Endpoint, HttpMethod};
pub use parser::{JsonParser, ParsedBody, RawParser, ResponseParser, TextParser};
