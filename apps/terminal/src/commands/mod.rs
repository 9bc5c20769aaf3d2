//! # Commands Module
//!
//! Entry points for a presentation layer. Each command takes only the
//! state it needs, plus the operator's [`Session`](caja_core::Session)
//! when the action is role-gated.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── checkout.rs  ◄─── Lines, discounts, payment method, finalize
//! ├── license.rs   ◄─── License status and activation
//! └── sync.rs      ◄─── Sync status and manual rounds
//! ```
//!
//! ## Error Contract
//! Every fallible command returns `AppResult<T>`; the `AppError` kind
//! tells the caller how to present it.

pub mod checkout;
pub mod license;
pub mod sync;
