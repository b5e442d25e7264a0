use dashboard_core::{
    Category, EndpointTemplate, HistoricalSeries, NormalizeError, Normalizer, PricePoint, Ticker, Upstream,
};
use serde_json::Value;

use crate::fields::{self, Object};

const INTERVAL: &str = "1d";

/// One year of daily bars from the chart endpoint.
///
/// The chart payload stores bars column-wise: a `timestamp` array plus
/// parallel `open`/`high`/`low`/`close`/`volume` arrays. Days with a null
/// close (halts, partial sessions) are skipped.
pub struct HistoricalNormalizer;

/// Column of the chart payload; an absent column reads as all-null.
fn column<'a>(block: Option<&'a Object>, key: &str, len: usize) -> Result<&'a [Value], NormalizeError> {
    let values = match block {
        Some(b) => fields::list(b, key)?,
        None => return Ok(&[]),
    };
    if !values.is_empty() && values.len() < len {
        return Err(NormalizeError::schema(format!(
            "`{key}` has {} values for {len} timestamps",
            values.len()
        )));
    }
    Ok(values)
}

fn cell(values: &[Value], index: usize, key: &str) -> Result<Option<f64>, NormalizeError> {
    match values.get(index) {
        Some(v) => fields::parse_number(key, v),
        None => Ok(None),
    }
}

impl Normalizer for HistoricalNormalizer {
    type Output = HistoricalSeries;

    const CATEGORY: Category = Category::Historical;

    fn endpoint() -> EndpointTemplate {
        EndpointTemplate {
            upstream: Upstream::Fundamentals,
            path: &["v8", "finance", "chart", "{ticker}"],
            query: &[("range", "1y"), ("interval", INTERVAL)],
        }
    }

    fn normalize(ticker: &Ticker, raw: &Value) -> Result<HistoricalSeries, NormalizeError> {
        let result = fields::first_result(raw, "chart")?;

        let currency = match fields::object(result, "meta")? {
            Some(meta) => fields::text(meta, "currency")?,
            None => None,
        };

        let timestamps = fields::list(result, "timestamp")?;
        if timestamps.is_empty() {
            return Err(NormalizeError::Missing);
        }
        let len = timestamps.len();

        let indicators = fields::object(result, "indicators")?
            .ok_or_else(|| NormalizeError::schema("chart result has no indicators"))?;
        let quote = match fields::list(indicators, "quote")?.first() {
            Some(q) => fields::as_object(q, "quote indicators")?,
            None => return Err(NormalizeError::schema("chart result has no quote indicators")),
        };
        let adjclose = match fields::list(indicators, "adjclose")?.first() {
            Some(a) => Some(fields::as_object(a, "adjclose indicators")?),
            None => None,
        };

        let closes = column(Some(quote), "close", len)?;
        if closes.is_empty() {
            return Err(NormalizeError::schema("chart result has no close prices"));
        }
        let opens = column(Some(quote), "open", len)?;
        let highs = column(Some(quote), "high", len)?;
        let lows = column(Some(quote), "low", len)?;
        let volumes = column(Some(quote), "volume", len)?;
        let adj_closes = column(adjclose, "adjclose", len)?;

        let mut points = Vec::with_capacity(len);
        for (i, ts) in timestamps.iter().enumerate() {
            let Some(close) = cell(closes, i, "close")? else {
                continue;
            };
            let date = fields::parse_date("timestamp", ts)?
                .ok_or_else(|| NormalizeError::schema("null timestamp in chart result"))?;
            let volume = match cell(volumes, i, "volume")? {
                Some(v) if v < 0.0 => return Err(NormalizeError::schema("negative volume in chart result")),
                Some(v) => Some(v.round() as u64),
                None => None,
            };

            points.push(PricePoint {
                date,
                open: cell(opens, i, "open")?,
                high: cell(highs, i, "high")?,
                low: cell(lows, i, "low")?,
                close,
                adj_close: cell(adj_closes, i, "adjclose")?,
                volume,
            });
        }

        if points.is_empty() {
            return Err(NormalizeError::Missing);
        }

        Ok(HistoricalSeries {
            symbol: ticker.to_string(),
            currency,
            interval: INTERVAL.to_string(),
            points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spy() -> Ticker {
        Ticker::parse("spy").unwrap()
    }

    fn chart(quote: Value, adjclose: Value, timestamps: Value) -> Value {
        json!({
            "chart": {
                "result": [{
                    "meta": {"currency": "USD", "symbol": "SPY"},
                    "timestamp": timestamps,
                    "indicators": {"quote": [quote], "adjclose": [adjclose]}
                }],
                "error": null
            }
        })
    }

    #[test]
    fn test_normalize_series() {
        let raw = chart(
            json!({
                "open": [500.1, 501.0, null],
                "high": [502.0, 503.5, null],
                "low": [499.0, 500.2, null],
                "close": [501.5, 503.0, null],
                "volume": [61000000, 58000000, null]
            }),
            json!({"adjclose": [499.9, 501.4, null]}),
            json!([1714743000, 1715002200, 1715088600]),
        );

        let series = HistoricalNormalizer::normalize(&spy(), &raw).unwrap();
        assert_eq!(series.symbol, "SPY");
        assert_eq!(series.currency.as_deref(), Some("USD"));
        assert_eq!(series.interval, "1d");
        assert_eq!(series.points.len(), 2);
        assert_eq!(
            series.points[0],
            PricePoint {
                date: "2024-05-03".to_string(),
                open: Some(500.1),
                high: Some(502.0),
                low: Some(499.0),
                close: 501.5,
                adj_close: Some(499.9),
                volume: Some(61_000_000),
            }
        );
        assert_eq!(series.points[1].date, "2024-05-06");
    }

    #[test]
    fn test_missing_adjclose_block_reads_as_null() {
        let raw = json!({
            "chart": {"result": [{
                "timestamp": [1714743000],
                "indicators": {"quote": [{"close": [501.5]}]}
            }]}
        });
        let series = HistoricalNormalizer::normalize(&spy(), &raw).unwrap();
        assert_eq!(series.currency, None);
        assert_eq!(series.points[0].adj_close, None);
        assert_eq!(series.points[0].open, None);
        assert_eq!(series.points[0].volume, None);
    }

    #[test]
    fn test_no_timestamps_is_missing() {
        let raw = json!({"chart": {"result": [{"meta": {"currency": "USD"}, "indicators": {"quote": [{}]}}]}});
        assert_eq!(HistoricalNormalizer::normalize(&spy(), &raw), Err(NormalizeError::Missing));
    }

    #[test]
    fn test_all_null_closes_is_missing() {
        let raw = chart(json!({"close": [null, null]}), json!({}), json!([1714743000, 1715002200]));
        assert_eq!(HistoricalNormalizer::normalize(&spy(), &raw), Err(NormalizeError::Missing));
    }

    #[test]
    fn test_delisted_symbol_is_missing() {
        let raw = json!({"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}});
        assert_eq!(HistoricalNormalizer::normalize(&spy(), &raw), Err(NormalizeError::Missing));
    }

    #[test]
    fn test_short_column_is_schema_error() {
        let raw = chart(
            json!({"close": [501.5, 503.0], "open": [500.0]}),
            json!({}),
            json!([1714743000, 1715002200]),
        );
        let err = HistoricalNormalizer::normalize(&spy(), &raw).unwrap_err();
        assert_eq!(err, NormalizeError::Schema("`open` has 1 values for 2 timestamps".to_string()));
    }
}
