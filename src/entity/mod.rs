pub mod customers;
pub mod orders;
pub mod payments;
pub mod products;
pub mod shipments;
pub mod store_settings;

pub use customers::Entity as Customers;
pub use orders::Entity as Orders;
pub use payments::Entity as Payments;
pub use products::Entity as Products;
pub use shipments::Entity as Shipments;
pub use store_settings::Entity as StoreSettingsRow;
