use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeKind {
    #[serde(rename = "aggTrades")]
    AggTrades,
    #[serde(rename = "trades")]
    Trades,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::AggTrades => "aggTrades",
            TradeKind::Trades => "trades",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim() {
            "aggTrades" | "aggtrades" | "agg_trades" => Ok(TradeKind::AggTrades),
            "trades" => Ok(TradeKind::Trades),
            other => Err(format!("unsupported trade kind: {other}")),
        }
    }
}

impl std::fmt::Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Market {
    Spot,
    /// USD-margined futures.
    Um,
    /// Coin-margined futures.
    Cm,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Market::Spot => "spot",
            Market::Um => "um",
            Market::Cm => "cm",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value.trim().to_lowercase().as_str() {
            "spot" => Ok(Market::Spot),
            "um" | "usdm" | "futures/um" => Ok(Market::Um),
            "cm" | "coinm" | "futures/cm" => Ok(Market::Cm),
            other => Err(format!("unsupported market: {other}")),
        }
    }

    /// Path segment used by the public archive mirror.
    pub fn archive_segment(&self) -> &'static str {
        match self {
            Market::Spot => "spot",
            Market::Um => "futures/um",
            Market::Cm => "futures/cm",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Market, TradeKind};

    #[test]
    fn parses_kinds_and_markets() {
        assert_eq!(TradeKind::parse("aggTrades").unwrap(), TradeKind::AggTrades);
        assert_eq!(TradeKind::parse("trades").unwrap(), TradeKind::Trades);
        assert!(TradeKind::parse("klines").is_err());
        assert_eq!(Market::parse("UM").unwrap().archive_segment(), "futures/um");
        assert!(Market::parse("options").is_err());
    }
}
