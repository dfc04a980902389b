//! Domain value objects and pure business rules.
//!
//! Everything here is synchronous and side-effect free: constructors
//! validate and normalize their input, and the plan rules are total
//! functions over their arguments.

pub mod bot;
pub mod business;
pub mod phone;
pub mod plan;
pub mod whatsapp;

pub use bot::{BotConfig, BotConfigInput, BotLanguage, BusinessHours};
pub use business::{
    BusinessInfo, BusinessInfoInput, BusinessType, ExpectedVolume, Industry, create_business_info,
    format_website_url,
};
pub use phone::{PhoneNumber, VerificationCode};
pub use plan::{
    AddOn, BillingCycle, BusinessSize, PlanTier, PriceVariant, Quote, get_business_size_category,
    get_recommended_plan, quote,
};
pub use whatsapp::{WhatsAppConfigInput, WhatsAppIntegrationConfig};
