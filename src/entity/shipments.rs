use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: Uuid,
    pub shipment_ref: String,
    pub order_id: Uuid,
    pub provider: String,
    pub provider_shipment_id: Option<String>,
    pub provider_order_id: Option<String>,
    pub awb_number: Option<String>,
    pub courier_name: Option<String>,
    pub courier_id: Option<i32>,
    pub package: Json,
    pub pickup_address: Json,
    pub delivery_address: Json,
    pub status: String,
    pub status_history: Json,
    pub tracking_history: Json,
    pub delivery_attempts: Json,
    pub items: Json,
    pub shipping_cost: i64,
    pub is_cod: bool,
    pub cod_amount: Option<i64>,
    pub tracking_url: Option<String>,
    pub last_tracked_at: Option<DateTimeWithTimeZone>,
    pub estimated_delivery_date: Option<DateTimeWithTimeZone>,
    pub actual_delivery_date: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
