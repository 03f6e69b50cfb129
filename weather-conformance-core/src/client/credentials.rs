use async_trait::async_trait;
use http::Extensions;
use reqwest::{Request, Response, Url};
use reqwest_middleware::{Middleware, Next};

/// Query parameter carrying the API key.
pub const API_KEY_PARAM: &str = "appid";

const REDACTED: &str = "<redacted>";

/// Attaches the API key to every request passing through the client.
#[derive(Clone)]
pub struct ApiKeyMiddleware {
    api_key: String,
}

impl ApiKeyMiddleware {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into() }
    }
}

// Keep the key out of Debug output.
impl std::fmt::Debug for ApiKeyMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyMiddleware")
            .field("api_key", &REDACTED)
            .finish()
    }
}

#[async_trait]
impl Middleware for ApiKeyMiddleware {
    async fn handle(
        &self,
        mut req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        inject_api_key(req.url_mut(), &self.api_key);
        next.run(req, extensions).await
    }
}

/// Set `appid` on `url`, replacing an existing value in place and appending
/// it otherwise. Other parameters keep their order and values.
pub fn inject_api_key(url: &mut Url, api_key: &str) {
    let mut replaced = false;
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter_map(|(k, v)| {
            if k == API_KEY_PARAM {
                if replaced {
                    return None;
                }
                replaced = true;
                return Some((k.into_owned(), api_key.to_string()));
            }
            Some((k.into_owned(), v.into_owned()))
        })
        .collect();

    let mut query = url.query_pairs_mut();
    query.clear();
    query.extend_pairs(pairs);
    if !replaced {
        query.append_pair(API_KEY_PARAM, api_key);
    }
}

/// Mask every `appid=<value>` in free text such as an error message.
pub fn redact_api_key(text: &str) -> String {
    let marker = format!("{API_KEY_PARAM}=");
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find(&marker) {
        let value_start = pos + marker.len();
        out.push_str(&rest[..value_start]);
        out.push_str(REDACTED);
        let value = &rest[value_start..];
        let end = value
            .find(|c: char| matches!(c, '&' | '#' | ')' | '"' | '\'') || c.is_whitespace())
            .unwrap_or(value.len());
        rest = &value[end..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn injected(input: &str, key: &str) -> String {
        let mut url = Url::parse(input).unwrap();
        inject_api_key(&mut url, key);
        url.to_string()
    }

    #[test]
    fn appends_key_to_existing_query() {
        assert_eq!(
            injected(
                "https://api.example.com/data/2.5/weather?id=2643743&units=metric",
                "KEY"
            ),
            "https://api.example.com/data/2.5/weather?id=2643743&units=metric&appid=KEY"
        );
    }

    #[test]
    fn adds_query_when_absent_or_empty() {
        assert_eq!(
            injected("https://api.example.com/weather", "KEY"),
            "https://api.example.com/weather?appid=KEY"
        );
        assert_eq!(
            injected("https://api.example.com/weather?", "KEY"),
            "https://api.example.com/weather?appid=KEY"
        );
    }

    #[test]
    fn overwrites_existing_key_in_place() {
        assert_eq!(
            injected("https://api.example.com/weather?appid=OLD&id=1", "NEW"),
            "https://api.example.com/weather?appid=NEW&id=1"
        );
    }

    #[test]
    fn collapses_duplicate_keys() {
        assert_eq!(
            injected(
                "https://api.example.com/weather?appid=A&id=1&appid=B",
                "NEW"
            ),
            "https://api.example.com/weather?appid=NEW&id=1"
        );
    }

    #[test]
    fn leaves_other_parameters_untouched() {
        let out = injected(
            "https://api.example.com/weather?lat=-33.8679&lon=151.2073&lang=lt&callback=someTestFunction",
            "KEY",
        );
        let url = Url::parse(&out).unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("lat".into(), "-33.8679".into()),
                ("lon".into(), "151.2073".into()),
                ("lang".into(), "lt".into()),
                ("callback".into(), "someTestFunction".into()),
                ("appid".into(), "KEY".into()),
            ]
        );
    }

    #[test]
    fn debug_does_not_leak_key() {
        let mw = ApiKeyMiddleware::new("super-secret");
        assert!(!format!("{mw:?}").contains("super-secret"));
    }

    #[test]
    fn redacts_key_in_messages() {
        let msg = "error sending request for url (http://127.0.0.1:9/weather?id=1&appid=SECRET-1)";
        let out = redact_api_key(msg);
        assert!(!out.contains("SECRET-1"));
        assert_eq!(
            out,
            "error sending request for url (http://127.0.0.1:9/weather?id=1&appid=<redacted>)"
        );
        assert_eq!(
            redact_api_key("appid=A&units=metric appid=B"),
            "appid=<redacted>&units=metric appid=<redacted>"
        );
        assert_eq!(redact_api_key("no key here"), "no key here");
    }
}
