//! HTTP/1.1 wire types: [`Method`], [`StatusCode`], [`Headers`],
//! [`Request`] and [`Response`].

use std::fmt;

pub mod headers;
pub mod request;
pub mod response;

pub use headers::Headers;
pub use request::Request;
pub use response::Response;

/// Correlation header, read from requests and echoed on every response.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Header carrying the client-chosen idempotency key for writes.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

macro_rules! status_codes {
    ($($variant:ident = $code:literal, $reason:literal;)+) => {
        /// Response status codes the API emits.
        ///
        /// ```
        /// use demo_api::http::StatusCode;
        ///
        /// assert_eq!(StatusCode::Created.as_u16(), 201);
        /// assert_eq!(StatusCode::NoContent.canonical_reason(), "No Content");
        /// assert_eq!(StatusCode::Conflict.to_string(), "409 Conflict");
        /// ```
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum StatusCode {
            $($variant = $code,)+
        }

        impl StatusCode {
            pub fn as_u16(self) -> u16 {
                self as u16
            }

            /// Reason phrase written on the status line.
            pub fn canonical_reason(self) -> &'static str {
                match self {
                    $(Self::$variant => $reason,)+
                }
            }
        }
    };
}

status_codes! {
    Ok = 200, "OK";
    Created = 201, "Created";
    NoContent = 204, "No Content";
    BadRequest = 400, "Bad Request";
    Unauthorized = 401, "Unauthorized";
    Forbidden = 403, "Forbidden";
    NotFound = 404, "Not Found";
    Conflict = 409, "Conflict";
    PayloadTooLarge = 413, "Payload Too Large";
    InternalServerError = 500, "Internal Server Error";
}

impl StatusCode {
    pub fn is_client_error(self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    pub fn is_server_error(self) -> bool {
        self.as_u16() >= 500
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.canonical_reason())
    }
}

/// Request method. Anything outside the common set is kept verbatim in
/// [`Method::Custom`], so parsing never fails.
///
/// ```
/// use demo_api::http::Method;
///
/// let method: Method = "PATCH".parse().unwrap();
/// assert_eq!(method, Method::Patch);
/// assert_eq!(method.as_str(), "PATCH");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Custom(String),
}

const STANDARD_METHODS: [(Method, &str); 7] = [
    (Method::Get, "GET"),
    (Method::Post, "POST"),
    (Method::Put, "PUT"),
    (Method::Patch, "PATCH"),
    (Method::Delete, "DELETE"),
    (Method::Head, "HEAD"),
    (Method::Options, "OPTIONS"),
];

impl Method {
    pub fn as_str(&self) -> &str {
        if let Self::Custom(name) = self {
            return name;
        }
        STANDARD_METHODS
            .iter()
            .find(|(m, _)| m == self)
            .map_or("", |(_, name)| *name)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let known = STANDARD_METHODS
            .iter()
            .find(|(_, name)| *name == s)
            .map(|(m, _)| m.clone());
        Ok(known.unwrap_or_else(|| Self::Custom(s.to_owned())))
    }
}
