use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tickvault_domain::errors::PipelineError;
use tickvault_domain::repositories::trade_history::{PageRequest, TradeHistorySource};
use tickvault_domain::services::decode::parse_f64;
use tickvault_domain::value_objects::agg_trade::AggTrade;
use tickvault_domain::value_objects::market::{Market, TradeKind};
use tickvault_domain::value_objects::spot_trade::SpotTrade;

pub fn default_base_url(market: Market) -> &'static str {
    match market {
        Market::Spot => "https://api.binance.com",
        Market::Um => "https://fapi.binance.com",
        Market::Cm => "https://dapi.binance.com",
    }
}

pub fn endpoint_path(market: Market, kind: TradeKind) -> &'static str {
    match (market, kind) {
        (Market::Spot, TradeKind::AggTrades) => "/api/v3/aggTrades",
        (Market::Spot, TradeKind::Trades) => "/api/v3/historicalTrades",
        (Market::Um, TradeKind::AggTrades) => "/fapi/v1/aggTrades",
        (Market::Um, TradeKind::Trades) => "/fapi/v1/historicalTrades",
        (Market::Cm, TradeKind::AggTrades) => "/dapi/v1/aggTrades",
        (Market::Cm, TradeKind::Trades) => "/dapi/v1/historicalTrades",
    }
}

#[derive(Debug, Deserialize)]
struct RestAggTrade {
    #[serde(rename = "a")]
    id: i64,
    #[serde(rename = "p")]
    price: String,
    #[serde(rename = "q")]
    qty: String,
    #[serde(rename = "f")]
    first_trade_id: i64,
    #[serde(rename = "l")]
    last_trade_id: i64,
    #[serde(rename = "T")]
    time: i64,
    #[serde(rename = "m")]
    is_buyer_maker: bool,
    #[serde(rename = "M")]
    is_best_match: Option<bool>,
}

impl RestAggTrade {
    fn into_domain(self) -> Result<AggTrade, PipelineError> {
        Ok(AggTrade {
            id: self.id,
            price: parse_f64("p", &self.price)?,
            qty: parse_f64("q", &self.qty)?,
            first_trade_id: self.first_trade_id,
            last_trade_id: self.last_trade_id,
            time: self.time,
            is_buyer_maker: self.is_buyer_maker,
            is_best_match: self.is_best_match,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestTrade {
    id: i64,
    price: String,
    qty: String,
    quote_qty: String,
    time: i64,
    is_buyer_maker: bool,
    #[serde(default)]
    is_best_match: bool,
}

impl RestTrade {
    fn into_domain(self) -> Result<SpotTrade, PipelineError> {
        Ok(SpotTrade {
            id: self.id,
            price: parse_f64("price", &self.price)?,
            qty: parse_f64("qty", &self.qty)?,
            quote_qty: parse_f64("quoteQty", &self.quote_qty)?,
            time: self.time,
            is_buyer_maker: self.is_buyer_maker,
            is_best_match: self.is_best_match,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RestClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
    pub api_key: Option<String>,
}

impl RestClientConfig {
    pub fn for_market(market: Market) -> Self {
        Self {
            base_url: default_base_url(market).to_string(),
            timeout_ms: 30_000,
            retries: 5,
            backoff_ms: 500,
            api_key: None,
        }
    }
}

/// Blocking client for the exchange's trade-history endpoints.
pub struct BinanceRestClient {
    config: RestClientConfig,
    client: Client,
}

impl BinanceRestClient {
    pub fn new(config: RestClientConfig) -> Result<Self, PipelineError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| PipelineError::transport("failed to build http client", err))?;
        Ok(Self { config, client })
    }

    fn get_page_body(
        &self,
        kind: TradeKind,
        request: &PageRequest<'_>,
    ) -> Result<String, PipelineError> {
        let path = endpoint_path(request.market, kind);
        let endpoint = format!("{}{path}", self.config.base_url.trim_end_matches('/'));
        let span = tracing::debug_span!(
            "infra.binance.page",
            endpoint = %endpoint,
            symbol = request.symbol,
            from_id = request.from_id,
            limit = request.limit
        );
        let _enter = span.enter();

        let from_id = request.from_id.to_string();
        let limit = request.limit.to_string();
        let start = Instant::now();
        let mut attempts = 0u32;
        let mut last_error = String::new();
        while attempts <= self.config.retries {
            attempts += 1;
            if attempts > 1 {
                metrics::counter!("tickvault.infra.binance.retries_total", "kind" => kind.as_str())
                    .increment(1);
                let backoff = self.config.backoff_ms * u64::from(attempts - 1);
                tracing::debug!(attempt = attempts, backoff_ms = backoff, "retrying history request");
                std::thread::sleep(Duration::from_millis(backoff));
            }
            metrics::counter!("tickvault.infra.binance.requests_total", "kind" => kind.as_str())
                .increment(1);

            let mut builder = self.client.get(&endpoint).query(&[
                ("symbol", request.symbol),
                ("fromId", from_id.as_str()),
                ("limit", limit.as_str()),
            ]);
            if let Some(api_key) = &self.config.api_key {
                builder = builder.header("X-MBX-APIKEY", api_key);
            }

            match builder.send() {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let body = resp.text().map_err(|err| {
                            PipelineError::transport("failed to read history response", err)
                        })?;
                        metrics::histogram!(
                            "tickvault.infra.binance.call_ms",
                            "kind" => kind.as_str(),
                            "result" => "ok"
                        )
                        .record(start.elapsed().as_millis() as f64);
                        return Ok(body);
                    }
                    let body = resp.text().unwrap_or_default();
                    last_error = format!("history http error: status {}: {body}", status.as_u16());
                    if is_retryable(status) {
                        continue;
                    }
                    break;
                }
                Err(err) => {
                    last_error = format!("history request failed: {err}");
                }
            }
        }

        metrics::counter!("tickvault.infra.binance.errors_total", "kind" => kind.as_str())
            .increment(1);
        tracing::warn!(attempts, error = %last_error, "history request failed");
        Err(PipelineError::Transport(format!(
            "{last_error} (after {attempts} attempts)"
        )))
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status.as_u16() == 418
        || status.is_server_error()
}

impl TradeHistorySource<AggTrade> for BinanceRestClient {
    fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Vec<AggTrade>, PipelineError> {
        let body = self.get_page_body(TradeKind::AggTrades, request)?;
        let rows: Vec<RestAggTrade> = serde_json::from_str(&body)
            .map_err(|err| PipelineError::transport("failed to parse aggTrades page", err))?;
        rows.into_iter().map(RestAggTrade::into_domain).collect()
    }
}

impl TradeHistorySource<SpotTrade> for BinanceRestClient {
    fn fetch_page(&self, request: &PageRequest<'_>) -> Result<Vec<SpotTrade>, PipelineError> {
        let body = self.get_page_body(TradeKind::Trades, request)?;
        let rows: Vec<RestTrade> = serde_json::from_str(&body)
            .map_err(|err| PipelineError::transport("failed to parse trades page", err))?;
        rows.into_iter().map(RestTrade::into_domain).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::{BinanceRestClient, RestClientConfig};
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::thread;
    use tickvault_domain::errors::PipelineError;
    use tickvault_domain::repositories::trade_history::{PageRequest, TradeHistorySource};
    use tickvault_domain::value_objects::agg_trade::AggTrade;
    use tickvault_domain::value_objects::market::Market;
    use tickvault_domain::value_objects::spot_trade::SpotTrade;

    fn http_response(status: u16, reason: &str, content_type: &str, body: &str) -> String {
        format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Type: {content_type}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        )
    }

    /// Serves `responses` in order and reports each request head.
    fn try_spawn_server(responses: Vec<String>) -> Option<(String, mpsc::Receiver<String>)> {
        let listener = TcpListener::bind("127.0.0.1:0").ok()?;
        let addr = listener.local_addr().ok()?;
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for response in responses {
                let (mut stream, _) = listener.accept().expect("accept");
                let mut buf = [0u8; 4096];
                let read = stream.read(&mut buf).unwrap_or(0);
                let _ = tx.send(String::from_utf8_lossy(&buf[..read]).to_string());
                stream
                    .write_all(response.as_bytes())
                    .expect("write response");
            }
        });

        Some((format!("http://{}", addr), rx))
    }

    fn client(base_url: String, retries: u32, api_key: Option<&str>) -> BinanceRestClient {
        BinanceRestClient::new(RestClientConfig {
            base_url,
            timeout_ms: 2_000,
            retries,
            backoff_ms: 1,
            api_key: api_key.map(str::to_string),
        })
        .expect("client")
    }

    fn request(market: Market) -> PageRequest<'static> {
        PageRequest {
            symbol: "BTCUSDT",
            market,
            from_id: 100,
            limit: 1000,
        }
    }

    #[test]
    fn agg_trades_page_is_decoded() {
        let body = r#"[{"a":100,"p":"0.01633102","q":"4.70443515","f":27781,"l":27782,"T":1498793709153,"m":true,"M":true},{"a":101,"p":"0.0164","q":"1","f":27783,"l":27783,"T":1498793709200,"m":false}]"#;
        let Some((base_url, requests)) =
            try_spawn_server(vec![http_response(200, "OK", "application/json", body)])
        else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };

        let page: Vec<AggTrade> = client(base_url, 0, None)
            .fetch_page(&request(Market::Spot))
            .expect("page");
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].price, 0.01633102);
        assert_eq!(page[0].is_best_match, Some(true));
        assert_eq!(page[1].is_best_match, None);

        let head = requests.recv().expect("request");
        assert!(head.starts_with("GET /api/v3/aggTrades?"));
        assert!(head.contains("symbol=BTCUSDT"));
        assert!(head.contains("fromId=100"));
        assert!(head.contains("limit=1000"));
    }

    #[test]
    fn rate_limit_is_retried() {
        let Some((base_url, _requests)) = try_spawn_server(vec![
            http_response(429, "Too Many Requests", "application/json", "{}"),
            http_response(200, "OK", "application/json", "[]"),
        ]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };

        let page: Vec<AggTrade> = client(base_url, 2, None)
            .fetch_page(&request(Market::Um))
            .expect("page");
        assert!(page.is_empty());
    }

    #[test]
    fn client_error_is_not_retried() {
        let Some((base_url, _requests)) = try_spawn_server(vec![http_response(
            400,
            "Bad Request",
            "application/json",
            r#"{"code":-1100,"msg":"Illegal characters"}"#,
        )]) else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };

        let err = TradeHistorySource::<AggTrade>::fetch_page(
            &client(base_url, 3, None),
            &request(Market::Spot),
        )
        .unwrap_err();
        match err {
            PipelineError::Transport(msg) => {
                assert!(msg.contains("status 400"));
                assert!(msg.contains("after 1 attempts"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn historical_trades_send_api_key() {
        let body = r#"[{"id":28457,"price":"4.00000100","qty":"12.00000000","quoteQty":"48.000012","time":1499865549590,"isBuyerMaker":true,"isBestMatch":true}]"#;
        let Some((base_url, requests)) =
            try_spawn_server(vec![http_response(200, "OK", "application/json", body)])
        else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };

        let page: Vec<SpotTrade> = client(base_url, 0, Some("secret"))
            .fetch_page(&request(Market::Cm))
            .expect("page");
        assert_eq!(page[0].id, 28457);
        assert_eq!(page[0].quote_qty, 48.000012);

        let head = requests.recv().expect("request").to_lowercase();
        assert!(head.starts_with("get /dapi/v1/historicaltrades?"));
        assert!(head.contains("x-mbx-apikey: secret"));
    }

    #[test]
    fn malformed_price_is_rejected() {
        let body = r#"[{"a":1,"p":"abc","q":"1","f":1,"l":1,"T":1,"m":true}]"#;
        let Some((base_url, _requests)) =
            try_spawn_server(vec![http_response(200, "OK", "application/json", body)])
        else {
            eprintln!("skipping: cannot bind local test server");
            return;
        };
        let err = TradeHistorySource::<AggTrade>::fetch_page(
            &client(base_url, 0, None),
            &request(Market::Spot),
        )
        .unwrap_err();
        assert_eq!(err.kind(), "decode");
    }
}
