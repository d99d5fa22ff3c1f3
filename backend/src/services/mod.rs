pub mod counter_service;
pub mod event_bus;
pub mod hunt_service;
pub mod participation_service;
pub mod sweep_service;

pub use counter_service::CounterService;
pub use event_bus::{EventBus, ParticipationEvent};
pub use hunt_service::HuntService;
pub use participation_service::{Departure, ParticipationService, PaymentResolution, RejectedPayment};
pub use sweep_service::{SweepConfig, SweepReport, SweepService};
