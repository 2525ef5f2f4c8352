pub mod clerk;
pub mod payu;
pub mod razorpay;
pub mod shiprocket;
