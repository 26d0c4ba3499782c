pub mod commission;
pub mod delivery;
pub mod outbox;
pub mod payments;
pub mod quotes;

pub use commission::{CommissionRates, CommissionService};
pub use delivery::DeliveryService;
pub use outbox::{run_dispatcher, NotificationSink, OutboxService, WebhookSink};
pub use payments::PaymentService;
pub use quotes::QuoteService;
