//! Raw responses and body decoding.
//!
//! The transport yields a [`RawResponse`]: status, headers and an undecoded
//! body. The executor decodes the body exactly once, into the shape picked
//! by the parse mode (explicit, or inferred from `Content-Type`).

use std::fmt;

use bytes::{Bytes, BytesMut};
use futures::stream::BoxStream;
use futures::StreamExt;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ClientError;
use crate::transport::TransportError;

/// Stream of body chunks coming off the wire.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// How to decode a response body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParseAs {
    /// Infer the mode from the response `Content-Type` header.
    #[default]
    Auto,
    Json,
    Text,
    /// Raw bytes, fully buffered.
    Binary,
    /// `multipart/form-data` or `application/x-www-form-urlencoded` fields.
    FormData,
    /// Hand the undecoded byte stream to the caller.
    Stream,
}

/// Infer the parse mode from a `Content-Type` header value.
///
/// A missing or unrecognized content type yields [`ParseAs::Stream`], which
/// leaves the body untouched for the caller.
pub fn infer_parse_as(content_type: Option<&str>) -> ParseAs {
    let Some(content_type) = content_type else {
        return ParseAs::Stream;
    };
    let cleaned = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    if cleaned == "application/json" || cleaned.ends_with("+json") {
        return ParseAs::Json;
    }
    if cleaned == "multipart/form-data" {
        return ParseAs::FormData;
    }
    if cleaned == "application/x-www-form-urlencoded" {
        return ParseAs::FormData;
    }
    if ["application/", "audio/", "image/", "video/"]
        .iter()
        .any(|prefix| cleaned.starts_with(prefix))
    {
        return ParseAs::Binary;
    }
    if cleaned.starts_with("text/") {
        return ParseAs::Text;
    }
    ParseAs::Stream
}

/// An undecoded response body.
pub enum ResponseBody {
    /// Body already held in memory (mock transports, replayed responses).
    Buffered(Bytes),
    /// Body still streaming off the connection.
    Stream(ByteStream),
}

impl ResponseBody {
    /// Collect the whole body into one buffer.
    pub async fn collect(self) -> Result<Bytes, TransportError> {
        match self {
            ResponseBody::Buffered(bytes) => Ok(bytes),
            ResponseBody::Stream(mut stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Convert into a chunk stream without buffering.
    pub fn into_stream(self) -> ByteStream {
        match self {
            ResponseBody::Buffered(bytes) => {
                if bytes.is_empty() {
                    futures::stream::empty().boxed()
                } else {
                    futures::stream::once(async move { Ok::<_, TransportError>(bytes) }).boxed()
                }
            }
            ResponseBody::Stream(stream) => stream,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Buffered(bytes) => {
                f.debug_tuple("Buffered").field(&bytes.len()).finish()
            }
            ResponseBody::Stream(_) => f.debug_tuple("Stream").finish(),
        }
    }
}

/// Status line and headers of a response, cheap to clone and safe to hand
/// to hooks after the body has been consumed.
#[derive(Clone, Debug)]
pub struct ResponseParts {
    pub status: StatusCode,
    pub headers: HeaderMap,
}

impl ResponseParts {
    /// The `Content-Type` header as a string, if present and valid.
    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok())
    }

    /// Whether the response is known to carry no body: 204 No Content or an
    /// explicit `Content-Length: 0`.
    pub fn has_empty_body(&self) -> bool {
        if self.status == StatusCode::NO_CONTENT {
            return true;
        }
        self.headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.trim() == "0")
            .unwrap_or(false)
    }
}

/// A response as produced by the transport: parts plus an undecoded body.
///
/// The body can be consumed at most once; decoding is destructive.
#[derive(Debug)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    body: Option<ResponseBody>,
}

impl RawResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: ResponseBody) -> Self {
        Self {
            status,
            headers,
            body: Some(body),
        }
    }

    /// A response with a fully-buffered body. Handy for mock transports.
    pub fn buffered(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self::new(status, headers, ResponseBody::Buffered(body.into()))
    }

    /// Clone out the status and headers.
    pub fn parts(&self) -> ResponseParts {
        ResponseParts {
            status: self.status,
            headers: self.headers.clone(),
        }
    }

    /// Take the body, leaving the response consumed.
    pub fn take_body(&mut self) -> Option<ResponseBody> {
        self.body.take()
    }

    /// Buffer the remaining body. An already-consumed body is an error.
    pub async fn bytes(&mut self) -> Result<Bytes, ClientError> {
        let body = self
            .body
            .take()
            .ok_or_else(|| ClientError::transport("response body already consumed"))?;
        Ok(body.collect().await?)
    }

    /// Decode the remaining body as UTF-8 text, lossily.
    pub async fn text(&mut self) -> Result<String, ClientError> {
        let bytes = self.bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Decode the remaining body as JSON. An empty body decodes to `{}`.
    pub async fn json(&mut self) -> Result<Value, ClientError> {
        let bytes = self.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Object(Default::default()));
        }
        serde_json::from_slice(&bytes).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// Decode the remaining body according to `parse_as`, which must not be
    /// [`ParseAs::Auto`] (resolve it with [`infer_parse_as`] first).
    pub async fn decode(&mut self, parse_as: ParseAs) -> Result<ResponseData, ClientError> {
        match parse_as {
            ParseAs::Auto => Err(ClientError::Decode(
                "parse mode must be resolved before decoding".to_string(),
            )),
            ParseAs::Json => Ok(ResponseData::Json(self.json().await?)),
            ParseAs::Text => Ok(ResponseData::Text(self.text().await?)),
            ParseAs::Binary => Ok(ResponseData::Binary(self.bytes().await?)),
            ParseAs::FormData => {
                let content_type = self
                    .headers
                    .get(CONTENT_TYPE)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);
                let bytes = self.bytes().await?;
                Ok(ResponseData::Form(parse_form_data(
                    content_type.as_deref(),
                    &bytes,
                )?))
            }
            ParseAs::Stream => {
                let body = self
                    .body
                    .take()
                    .ok_or_else(|| ClientError::transport("response body already consumed"))?;
                Ok(ResponseData::Stream(body.into_stream()))
            }
        }
    }
}

/// A decoded response body.
pub enum ResponseData {
    Json(Value),
    Text(String),
    Binary(Bytes),
    /// Ordered form fields, as decoded from urlencoded or multipart bodies.
    Form(Vec<(String, String)>),
    Stream(ByteStream),
}

impl ResponseData {
    /// The empty payload of the given parse mode, used for bodyless
    /// responses (204, `Content-Length: 0`).
    pub fn empty_for(parse_as: ParseAs) -> Self {
        match parse_as {
            ParseAs::Auto | ParseAs::Json => ResponseData::Json(Value::Object(Default::default())),
            ParseAs::Text => ResponseData::Text(String::new()),
            ParseAs::Binary => ResponseData::Binary(Bytes::new()),
            ParseAs::FormData => ResponseData::Form(Vec::new()),
            ParseAs::Stream => ResponseData::Stream(futures::stream::empty().boxed()),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseData::Binary(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Consume the payload, yielding the stream for [`Stream`](ResponseData::Stream).
    pub fn into_stream(self) -> Option<ByteStream> {
        match self {
            ResponseData::Stream(stream) => Some(stream),
            _ => None,
        }
    }
}

impl fmt::Debug for ResponseData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseData::Json(value) => f.debug_tuple("Json").field(value).finish(),
            ResponseData::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ResponseData::Binary(bytes) => f.debug_tuple("Binary").field(&bytes.len()).finish(),
            ResponseData::Form(fields) => f.debug_tuple("Form").field(fields).finish(),
            ResponseData::Stream(_) => f.debug_tuple("Stream").finish(),
        }
    }
}

/// Decode form fields from an urlencoded or multipart body.
fn parse_form_data(
    content_type: Option<&str>,
    bytes: &Bytes,
) -> Result<Vec<(String, String)>, ClientError> {
    let is_multipart = content_type
        .map(|ct| ct.trim_start().to_ascii_lowercase().starts_with("multipart/"))
        .unwrap_or(false);
    if is_multipart {
        let boundary = content_type
            .and_then(extract_boundary)
            .ok_or_else(|| ClientError::Decode("multipart body without boundary".to_string()))?;
        parse_multipart(&boundary, bytes)
    } else {
        Ok(parse_urlencoded(bytes))
    }
}

fn extract_boundary(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|part| {
        let part = part.trim();
        let value = part.strip_prefix("boundary=")?;
        Some(value.trim_matches('"').to_string())
    })
}

fn parse_urlencoded(bytes: &Bytes) -> Vec<(String, String)> {
    let text = String::from_utf8_lossy(bytes);
    text.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (decode_form_component(key), decode_form_component(value))
        })
        .collect()
}

fn decode_form_component(component: &str) -> String {
    let plus_decoded = component.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

fn parse_multipart(boundary: &str, bytes: &Bytes) -> Result<Vec<(String, String)>, ClientError> {
    let text = String::from_utf8_lossy(bytes);
    let delimiter = format!("--{}", boundary);
    let mut fields = Vec::new();

    for part in text.split(delimiter.as_str()).skip(1) {
        let part = part.trim_start_matches("\r\n");
        if part.starts_with("--") || part.is_empty() {
            break;
        }
        let Some((raw_headers, body)) = part.split_once("\r\n\r\n") else {
            continue;
        };
        let Some(name) = part_field_name(raw_headers) else {
            continue;
        };
        let value = body.trim_end_matches("\r\n").to_string();
        fields.push((name, value));
    }
    Ok(fields)
}

fn part_field_name(raw_headers: &str) -> Option<String> {
    for line in raw_headers.lines() {
        let (header, rest) = line.split_once(':')?;
        if !header.eq_ignore_ascii_case("content-disposition") {
            continue;
        }
        for attr in rest.split(';') {
            let attr = attr.trim();
            if let Some(value) = attr.strip_prefix("name=") {
                return Some(value.trim_matches('"').to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_missing_content_type_is_stream() {
        assert_eq!(infer_parse_as(None), ParseAs::Stream);
    }

    #[test]
    fn test_infer_json() {
        assert_eq!(infer_parse_as(Some("application/json")), ParseAs::Json);
        assert_eq!(
            infer_parse_as(Some("application/json; charset=utf-8")),
            ParseAs::Json
        );
        assert_eq!(infer_parse_as(Some("application/ld+json")), ParseAs::Json);
    }

    #[test]
    fn test_infer_form_data() {
        assert_eq!(
            infer_parse_as(Some("multipart/form-data; boundary=x")),
            ParseAs::FormData
        );
        assert_eq!(
            infer_parse_as(Some("application/x-www-form-urlencoded")),
            ParseAs::FormData
        );
    }

    #[test]
    fn test_infer_binary_prefixes() {
        assert_eq!(infer_parse_as(Some("application/pdf")), ParseAs::Binary);
        assert_eq!(infer_parse_as(Some("image/png")), ParseAs::Binary);
        assert_eq!(infer_parse_as(Some("audio/mpeg")), ParseAs::Binary);
        assert_eq!(infer_parse_as(Some("video/mp4")), ParseAs::Binary);
    }

    #[test]
    fn test_infer_text_and_unknown() {
        assert_eq!(infer_parse_as(Some("text/plain")), ParseAs::Text);
        assert_eq!(infer_parse_as(Some("x-custom/thing")), ParseAs::Stream);
    }

    #[tokio::test]
    async fn test_json_decode_of_empty_body_is_empty_object() {
        let mut response =
            RawResponse::buffered(StatusCode::OK, HeaderMap::new(), Bytes::new());
        let value = response.json().await.unwrap();
        assert_eq!(value, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_body_consumed_once() {
        let mut response =
            RawResponse::buffered(StatusCode::OK, HeaderMap::new(), &b"hello"[..]);
        assert_eq!(response.text().await.unwrap(), "hello");
        assert!(response.text().await.is_err());
    }

    #[tokio::test]
    async fn test_decode_invalid_json_is_decode_error() {
        let mut response =
            RawResponse::buffered(StatusCode::OK, HeaderMap::new(), &b"not json"[..]);
        match response.decode(ParseAs::Json).await {
            Err(ClientError::Decode(_)) => {}
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stream_decode_yields_chunks() {
        let mut response =
            RawResponse::buffered(StatusCode::OK, HeaderMap::new(), &b"chunk"[..]);
        let data = response.decode(ParseAs::Stream).await.unwrap();
        let mut stream = data.into_stream().unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"chunk");
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn test_empty_body_detection() {
        let parts = ResponseParts {
            status: StatusCode::NO_CONTENT,
            headers: HeaderMap::new(),
        };
        assert!(parts.has_empty_body());

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_LENGTH, "0".parse().unwrap());
        let parts = ResponseParts {
            status: StatusCode::OK,
            headers,
        };
        assert!(parts.has_empty_body());

        let parts = ResponseParts {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
        };
        assert!(!parts.has_empty_body());
    }

    #[test]
    fn test_parse_urlencoded_fields() {
        let bytes = Bytes::from_static(b"name=Alex+B&tag=a%2Fb&flag");
        let fields = parse_urlencoded(&bytes);
        assert_eq!(
            fields,
            vec![
                ("name".to_string(), "Alex B".to_string()),
                ("tag".to_string(), "a/b".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_parse_multipart_fields() {
        let body = concat!(
            "--xyz\r\n",
            "Content-Disposition: form-data; name=\"title\"\r\n",
            "\r\n",
            "hello\r\n",
            "--xyz\r\n",
            "Content-Disposition: form-data; name=\"count\"\r\n",
            "\r\n",
            "2\r\n",
            "--xyz--\r\n"
        );
        let fields = parse_form_data(
            Some("multipart/form-data; boundary=xyz"),
            &Bytes::from_static(body.as_bytes()),
        )
        .unwrap();
        assert_eq!(
            fields,
            vec![
                ("title".to_string(), "hello".to_string()),
                ("count".to_string(), "2".to_string()),
            ]
        );
    }
}
