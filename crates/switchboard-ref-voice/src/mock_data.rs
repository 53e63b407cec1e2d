//! Canned answers for the reference tools.
//!
//! All data is fictional. No external API calls are made.

/// Current conditions for `location`.
pub fn weather_report(location: &str) -> String {
    format!("The weather in {} is sunny", location)
}

/// Latest quote for `stock`.
pub fn stock_quote(stock: &str) -> String {
    format!("The price of {} is $100", stock)
}

/// Answers a caller gives during the daily check-in, in question order.
pub const DAILY_ANSWERS: [(&str, &str); 4] = [
    ("daily_cigarettes", "5"),
    ("daily_sleep", "7"),
    ("daily_feeling", "ok"),
    ("daily_reason", "stress"),
];

/// Answers a caller gives during contact intake, in question order.
pub const CONTACT_ANSWERS: [(&str, &str); 6] = [
    ("date", "2025-03-14"),
    ("name", "Ada Lovelace"),
    ("email", "ada@example.com"),
    ("phone", "(555) 010-4477"),
    ("address", "12 St James's Square"),
    ("city", "London"),
];
