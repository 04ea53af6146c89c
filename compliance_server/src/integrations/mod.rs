mod payment_ops;

pub use payment_ops::PaymentOpsClient;
