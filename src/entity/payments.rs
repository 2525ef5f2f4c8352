use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub payment_ref: String,
    pub order_id: Uuid,
    pub provider: String,
    pub amount: i64,
    pub currency: String,
    pub amount_refunded: i64,
    pub provider_payment_id: Option<String>,
    pub provider_order_id: Option<String>,
    pub provider_signature: Option<String>,
    pub status: String,
    pub status_history: Json,
    pub payment_method: Option<Json>,
    pub refunds: Json,
    pub webhook_events: Json,
    pub customer_email: String,
    pub customer_phone: String,
    pub customer_name: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub authorized_at: Option<DateTimeWithTimeZone>,
    pub captured_at: Option<DateTimeWithTimeZone>,
    pub failed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
