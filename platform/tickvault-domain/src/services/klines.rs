use crate::errors::PipelineError;
use crate::value_objects::interval::{Interval, DAY_MS};
use crate::value_objects::kline::Kline;
use crate::value_objects::record::TradeRecord;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

pub const VOLUME_DECIMALS: u32 = 8;

/// `acc + delta` rounded half away from zero to eight decimal places.
pub fn add_rounded(acc: f64, delta: f64) -> f64 {
    let (Some(acc_dec), Some(delta_dec)) = (Decimal::from_f64(acc), Decimal::from_f64(delta))
    else {
        return acc + delta;
    };
    acc_dec
        .checked_add(delta_dec)
        .map(|sum| {
            sum.round_dp_with_strategy(VOLUME_DECIMALS, RoundingStrategy::MidpointAwayFromZero)
        })
        .and_then(|sum| sum.to_f64())
        .unwrap_or(acc + delta)
}

/// Start of the bucket holding `time_ms`, counted from that day's UTC midnight.
pub fn bucket_open_time(time_ms: i64, interval_ms: i64) -> i64 {
    let midnight = time_ms.div_euclid(DAY_MS) * DAY_MS;
    midnight + (time_ms - midnight) / interval_ms * interval_ms
}

fn fold_trade<T: TradeRecord>(kline: &mut Kline, trade: &T) {
    let price = trade.price();
    let qty = trade.qty();
    kline.high = kline.high.max(price);
    kline.low = kline.low.min(price);
    kline.close = price;
    kline.volume = add_rounded(kline.volume, qty);
    kline.quote_volume = add_rounded(kline.quote_volume, qty * price);
    kline.trades += trade.trade_count();
    if !trade.is_buyer_maker() {
        kline.taker_buy_base_volume = add_rounded(kline.taker_buy_base_volume, qty);
        kline.taker_buy_quote_volume = add_rounded(kline.taker_buy_quote_volume, qty * price);
    }
}

/// Folds a time-ordered trade stream into contiguous candles.
///
/// The first bucket is aligned to the UTC midnight of the first trade; later
/// buckets continue that grid, which meets every later midnight because the
/// interval must divide a day. Buckets with no trades between two traded
/// buckets become flat candles at the previous close.
pub fn aggregate_klines<T: TradeRecord>(
    trades: &[T],
    interval: Interval,
) -> Result<Vec<Kline>, PipelineError> {
    let Some(first) = trades.first() else {
        return Ok(Vec::new());
    };
    let step = interval.ensure_candle_width()?.millis();

    let mut klines = Vec::new();
    let mut current = Kline::flat(bucket_open_time(first.time(), step), step, first.price());
    for trade in trades {
        if trade.time() > current.close_time {
            let buckets_ahead = (trade.time() - current.open_time) / step;
            let closed_open = current.open_time;
            let previous_close = current.close;
            klines.push(current);
            for offset in 1..buckets_ahead {
                klines.push(Kline::flat(closed_open + offset * step, step, previous_close));
            }
            current = Kline::flat(closed_open + buckets_ahead * step, step, trade.price());
        }
        fold_trade(&mut current, trade);
    }
    klines.push(current);
    Ok(klines)
}
