use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use corsair_core::models::promo::Promocode;
use corsair_core::models::request::Request;

pub fn user_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new("🎟 Redeem Promo Code"),
            KeyboardButton::new("📨 Request Subscription"),
        ],
        vec![KeyboardButton::new("📊 My Subscription")],
    ])
    .resize_keyboard()
}

pub fn admin_menu() -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![
            KeyboardButton::new("📋 Pending Requests"),
            KeyboardButton::new("🎟 Promo Codes"),
        ],
        vec![
            KeyboardButton::new("🛠 Grant Subscription"),
            KeyboardButton::new("⬅️ User Menu"),
        ],
    ])
    .resize_keyboard()
}

/// One "Reply" button per pending request.
pub fn pending_requests_keyboard(requests: &[Request]) -> InlineKeyboardMarkup {
    let buttons = requests
        .iter()
        .map(|req| {
            vec![InlineKeyboardButton::callback(
                format!("💬 Reply to {}", short_id(&req.request_id)),
                format!("req_reply_{}", req.request_id),
            )]
        })
        .collect::<Vec<_>>();
    InlineKeyboardMarkup::new(buttons)
}

pub fn promo_list_keyboard(codes: &[Promocode]) -> InlineKeyboardMarkup {
    let mut buttons = vec![vec![InlineKeyboardButton::callback(
        "➕ Add Code",
        "promo_add",
    )]];
    for promo in codes {
        let mut row = Vec::new();
        if promo.active {
            row.push(InlineKeyboardButton::callback(
                format!("🚫 Disable {}", promo.code),
                format!("promo_off_{}", promo.code),
            ));
        }
        row.push(InlineKeyboardButton::callback(
            format!("🗑 Delete {}", promo.code),
            format!("promo_del_{}", promo.code),
        ));
        buttons.push(row);
    }
    InlineKeyboardMarkup::new(buttons)
}

pub fn short_id(request_id: &str) -> &str {
    request_id.split('-').next().unwrap_or(request_id)
}
