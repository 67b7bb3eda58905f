//! 데이터 수집 모듈.

pub mod etf_kpis;
pub mod top_gainers;

pub use etf_kpis::collect_etf_kpis;
pub use top_gainers::collect_top_gainers;
