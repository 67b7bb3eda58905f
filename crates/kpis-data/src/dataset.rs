//! KPI 데이터셋 조립.
//!
//! 상장 종목과 종목별 시세를 symbol 기준으로 left join하여 하나의
//! DataFrame으로 만들고, 선언된 스키마 타입으로 캐스팅합니다.
//! 시세가 없는 종목의 행은 유지되며 시세 컬럼만 null이 됩니다.

use crate::error::Result;
use crate::provider::{EtfListing, EtfQuote, GainerRow};
use polars::prelude::*;
use std::collections::HashMap;

/// 시세 숫자 컬럼 (전부 nullable Float64).
const QUOTE_NUMERIC_COLUMNS: [&str; 13] = [
    "previous_close",
    "nav_price",
    "trailing_pe",
    "volume",
    "average_volume",
    "bid",
    "bid_size",
    "ask",
    "ask_size",
    "beta_three_year",
    "ytd_return",
    "three_year_avg_return",
    "five_year_avg_return",
];

/// 시세 컬럼 누적 버퍼.
#[derive(Default)]
struct QuoteVecs {
    previous_close: Vec<Option<f64>>,
    nav_price: Vec<Option<f64>>,
    trailing_pe: Vec<Option<f64>>,
    volume: Vec<Option<f64>>,
    average_volume: Vec<Option<f64>>,
    bid: Vec<Option<f64>>,
    bid_size: Vec<Option<f64>>,
    ask: Vec<Option<f64>>,
    ask_size: Vec<Option<f64>>,
    beta_three_year: Vec<Option<f64>>,
    ytd_return: Vec<Option<f64>>,
    three_year_avg_return: Vec<Option<f64>>,
    five_year_avg_return: Vec<Option<f64>>,
    category: Vec<Option<String>>,
    business_summary: Vec<Option<String>>,
}

impl QuoteVecs {
    fn push(&mut self, quote: &EtfQuote) {
        self.previous_close.push(quote.previous_close);
        self.nav_price.push(quote.nav_price);
        self.trailing_pe.push(quote.trailing_pe);
        self.volume.push(quote.volume);
        self.average_volume.push(quote.average_volume);
        self.bid.push(quote.bid);
        self.bid_size.push(quote.bid_size);
        self.ask.push(quote.ask);
        self.ask_size.push(quote.ask_size);
        self.beta_three_year.push(quote.beta_three_year);
        self.ytd_return.push(quote.ytd_return);
        self.three_year_avg_return.push(quote.three_year_avg_return);
        self.five_year_avg_return.push(quote.five_year_avg_return);
        self.category.push(quote.category.clone());
        self.business_summary.push(quote.business_summary.clone());
    }
}

/// 상장 종목 + 시세 left join 프레임 생성.
///
/// 상장 종목당 정확히 한 행이 생성됩니다. 시세 맵에 심볼이 없으면
/// 시세 컬럼은 전부 null입니다.
pub fn build_kpi_frame(
    listings: &[EtfListing],
    quotes: &HashMap<String, EtfQuote>,
) -> Result<DataFrame> {
    let mut symbol = Vec::with_capacity(listings.len());
    let mut name = Vec::with_capacity(listings.len());
    let mut ipo_date = Vec::with_capacity(listings.len());
    let mut q = QuoteVecs::default();

    let missing = EtfQuote::default();
    for listing in listings {
        symbol.push(listing.symbol.clone());
        name.push(listing.name.clone());
        ipo_date.push(listing.ipo_date.format("%Y-%m-%d").to_string());
        q.push(quotes.get(&listing.symbol).unwrap_or(&missing));
    }

    let df = df!(
        "symbol" => symbol,
        "name" => name,
        "ipo_date" => ipo_date,
        "previous_close" => q.previous_close,
        "nav_price" => q.nav_price,
        "trailing_pe" => q.trailing_pe,
        "volume" => q.volume,
        "average_volume" => q.average_volume,
        "bid" => q.bid,
        "bid_size" => q.bid_size,
        "ask" => q.ask,
        "ask_size" => q.ask_size,
        "beta_three_year" => q.beta_three_year,
        "ytd_return" => q.ytd_return,
        "three_year_avg_return" => q.three_year_avg_return,
        "five_year_avg_return" => q.five_year_avg_return,
        "category" => q.category,
        "business_summary" => q.business_summary,
    )?;
    Ok(df)
}

/// 상승률 상위 종목 + 시세 left join 프레임 생성.
///
/// 페이로드 자체의 거래량은 시세의 `volume`과 구분하기 위해
/// `day_volume` 컬럼으로 들어갑니다.
pub fn build_gainers_frame(
    gainers: &[GainerRow],
    quotes: &HashMap<String, EtfQuote>,
) -> Result<DataFrame> {
    let mut symbol = Vec::with_capacity(gainers.len());
    let mut price = Vec::with_capacity(gainers.len());
    let mut change_amount = Vec::with_capacity(gainers.len());
    let mut change_percentage = Vec::with_capacity(gainers.len());
    let mut day_volume = Vec::with_capacity(gainers.len());
    let mut q = QuoteVecs::default();

    let missing = EtfQuote::default();
    for gainer in gainers {
        symbol.push(gainer.ticker.clone());
        price.push(gainer.price);
        change_amount.push(gainer.change_amount);
        change_percentage.push(gainer.change_percentage);
        day_volume.push(gainer.volume);
        q.push(quotes.get(&gainer.ticker).unwrap_or(&missing));
    }

    let df = df!(
        "symbol" => symbol,
        "price" => price,
        "change_amount" => change_amount,
        "change_percentage" => change_percentage,
        "day_volume" => day_volume,
        "previous_close" => q.previous_close,
        "nav_price" => q.nav_price,
        "trailing_pe" => q.trailing_pe,
        "volume" => q.volume,
        "average_volume" => q.average_volume,
        "bid" => q.bid,
        "bid_size" => q.bid_size,
        "ask" => q.ask,
        "ask_size" => q.ask_size,
        "beta_three_year" => q.beta_three_year,
        "ytd_return" => q.ytd_return,
        "three_year_avg_return" => q.three_year_avg_return,
        "five_year_avg_return" => q.five_year_avg_return,
        "category" => q.category,
        "business_summary" => q.business_summary,
    )?;
    Ok(df)
}

/// ETF KPI 프레임을 선언된 스키마 타입으로 캐스팅.
///
/// - `symbol`, `name`, `category`, `business_summary`: String
/// - `ipo_date`: Date (`%Y-%m-%d`)
/// - 숫자 컬럼: nullable Float64
pub fn cast_kpi_frame(df: DataFrame) -> Result<DataFrame> {
    let mut exprs: Vec<Expr> = vec![
        col("symbol").cast(DataType::String),
        col("name").cast(DataType::String),
        col("ipo_date").str().to_date(StrptimeOptions {
            format: Some("%Y-%m-%d".into()),
            ..Default::default()
        }),
    ];
    for column in QUOTE_NUMERIC_COLUMNS {
        exprs.push(col(column).cast(DataType::Float64));
    }
    exprs.push(col("category").cast(DataType::String));
    exprs.push(col("business_summary").cast(DataType::String));

    Ok(df.lazy().with_columns(exprs).collect()?)
}

/// 상승률 상위 프레임 캐스팅 (날짜 컬럼 없음).
pub fn cast_gainers_frame(df: DataFrame) -> Result<DataFrame> {
    let mut exprs: Vec<Expr> = vec![col("symbol").cast(DataType::String)];
    for column in ["price", "change_amount", "change_percentage", "day_volume"] {
        exprs.push(col(column).cast(DataType::Float64));
    }
    for column in QUOTE_NUMERIC_COLUMNS {
        exprs.push(col(column).cast(DataType::Float64));
    }
    exprs.push(col("category").cast(DataType::String));
    exprs.push(col("business_summary").cast(DataType::String));

    Ok(df.lazy().with_columns(exprs).collect()?)
}

/// 전체 null 여부 판정.
///
/// 캐스팅 이후에 호출합니다. 행이 하나도 없거나 모든 컬럼의 모든 셀이
/// null이면 true입니다. 이런 프레임은 저장 전에 거부되어야 합니다.
pub fn is_all_null(df: &DataFrame) -> bool {
    df.height() == 0
        || df
            .get_columns()
            .iter()
            .all(|column| column.null_count() == column.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn listing(symbol: &str) -> EtfListing {
        EtfListing {
            symbol: symbol.to_string(),
            name: format!("{} Fund", symbol),
            ipo_date: NaiveDate::from_ymd_opt(2021, 5, 1).unwrap(),
            exchange: "NASDAQ".to_string(),
        }
    }

    fn quote(symbol: &str, previous_close: f64) -> EtfQuote {
        EtfQuote {
            symbol: symbol.to_string(),
            previous_close: Some(previous_close),
            volume: Some(1000.0),
            category: Some("Large Blend".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_join_one_row_per_listing() {
        let listings = vec![listing("AAA"), listing("BBB"), listing("CCC")];
        let mut quotes = HashMap::new();
        quotes.insert("AAA".to_string(), quote("AAA", 10.0));
        // BBB, CCC는 시세 없음

        let df = build_kpi_frame(&listings, &quotes).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.column("previous_close").unwrap().null_count(), 2);
        // 행 자체는 유실되지 않음
        assert_eq!(df.column("symbol").unwrap().null_count(), 0);
    }

    #[test]
    fn test_cast_kpi_frame_types() {
        let listings = vec![listing("AAA")];
        let mut quotes = HashMap::new();
        quotes.insert("AAA".to_string(), quote("AAA", 10.0));

        let df = cast_kpi_frame(build_kpi_frame(&listings, &quotes).unwrap()).unwrap();

        assert_eq!(df.column("ipo_date").unwrap().dtype(), &DataType::Date);
        assert_eq!(
            df.column("previous_close").unwrap().dtype(),
            &DataType::Float64
        );
        assert_eq!(df.column("symbol").unwrap().dtype(), &DataType::String);
    }

    #[test]
    fn test_is_all_null_empty_frame() {
        let df = build_kpi_frame(&[], &HashMap::new()).unwrap();
        assert!(is_all_null(&df));
    }

    #[test]
    fn test_is_all_null_with_data() {
        let listings = vec![listing("AAA")];
        let df = build_kpi_frame(&listings, &HashMap::new()).unwrap();
        // symbol/name/ipo_date 컬럼에 값이 있으므로 전체 null 아님
        assert!(!is_all_null(&df));
    }

    #[test]
    fn test_is_all_null_true_when_every_cell_null() {
        let df = df!(
            "a" => Vec::<Option<f64>>::from([None, None]),
            "b" => Vec::<Option<String>>::from([None, None]),
        )
        .unwrap();
        assert!(is_all_null(&df));
    }

    #[test]
    fn test_build_gainers_frame_join() {
        let gainers = vec![
            GainerRow {
                ticker: "ABC".to_string(),
                price: Some(4.56),
                change_amount: Some(1.23),
                change_percentage: Some(36.94),
                volume: Some(1200000.0),
            },
            GainerRow {
                ticker: "DEF".to_string(),
                price: None,
                change_amount: None,
                change_percentage: None,
                volume: None,
            },
        ];
        let mut quotes = HashMap::new();
        quotes.insert("ABC".to_string(), quote("ABC", 4.0));

        let df = cast_gainers_frame(build_gainers_frame(&gainers, &quotes).unwrap()).unwrap();

        assert_eq!(df.height(), 2);
        assert_eq!(df.column("day_volume").unwrap().null_count(), 1);
        assert_eq!(df.column("previous_close").unwrap().null_count(), 1);
    }
}
