use crate::db::{DbPool, OrmConn};
use crate::payments::RazorpayClient;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
    pub orm: OrmConn,
    pub payments: RazorpayClient,
}
