use ludic_shared::{Clock, INIT_DATA_HEADER, LoadError, MATCHES_PATH, MatchListResponse, MatchSource};

/// Same-origin `GET /api/matches`.
pub struct HttpMatchSource;

impl MatchSource for HttpMatchSource {
    async fn fetch_matches(
        &self,
        init_data: Option<&str>,
    ) -> Result<MatchListResponse, LoadError> {
        let mut request = gloo_net::http::Request::get(MATCHES_PATH);
        if let Some(token) = init_data {
            request = request.header(INIT_DATA_HEADER, token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| LoadError::Transport(e.to_string()))?;

        if !resp.ok() {
            return Err(LoadError::from_status(resp.status()));
        }

        resp.json::<MatchListResponse>()
            .await
            .map_err(|e| LoadError::Decode(e.to_string()))
    }
}

pub struct BrowserClock;

impl Clock for BrowserClock {
    fn now_ms(&self) -> f64 {
        js_sys::Date::now()
    }
}
