// Business logic layer. Each service is built per request from `AppState`.

pub mod appointment;
pub mod auth;
pub mod business;
pub mod dashboard;
pub mod invoice;
pub mod jwt;
pub mod ledger;
pub mod order;
pub mod payment;
pub mod points;
pub mod product;
pub mod reward;
pub mod treatment;
pub mod user;
pub mod wallet;

pub use appointment::AppointmentService;
pub use auth::AuthService;
pub use business::BusinessService;
pub use dashboard::DashboardService;
pub use invoice::InvoiceService;
pub use jwt::{JwtConfig, JwtError, JwtService};
pub use ledger::{PointsLedger, WalletLedger};
pub use order::OrderService;
pub use payment::PaymentService;
pub use points::PointsService;
pub use product::ProductService;
pub use reward::RewardService;
pub use treatment::TreatmentService;
pub use user::UserService;
pub use wallet::WalletService;
