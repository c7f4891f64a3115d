pub mod config;
pub mod expression;

pub use config::{AppConfig, LogConfig};
pub use expression::{
    AuthorizeResponse, CalculateRequest, CalculateResponse, Credentials, Expression,
    ExpressionResponse, ExpressionStatus, ExpressionsResponse, ListExpressionsQuery, LoginTokens,
};
