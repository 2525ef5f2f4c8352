use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub order_number: String,
    pub customer: Json,
    pub items: Json,
    pub shipping_address: Json,
    pub billing_address: Option<Json>,
    pub subtotal: i64,
    pub discount: i64,
    pub discount_code: Option<String>,
    pub shipping_cost: i64,
    pub tax: i64,
    pub total_amount: i64,
    pub currency: String,
    pub status: String,
    pub payment_details: Json,
    pub shipping_details: Option<Json>,
    pub fulfillment_status: String,
    pub notes: Json,
    pub timeline: Json,
    pub tags: Json,
    pub assigned_to: Option<String>,
    pub is_archived: bool,
    pub requires_shipping: bool,
    pub source: String,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

// Payments and shipments reference orders by a loose `order_id` column, not a
// declared relation, mirroring the document-store coupling.
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
