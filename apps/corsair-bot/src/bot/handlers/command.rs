use teloxide::prelude::*;
use teloxide::types::{ChatId, ForceReply, ParseMode};
use tracing::{error, info};

use crate::bot::keyboards::{admin_menu, pending_requests_keyboard, short_id, user_menu};
use crate::bot::utils::{format_devices, format_timestamp, format_gb};
use crate::state::AppState;

use corsair_core::models::request::RequestStatus;

pub async fn message_handler(
    bot: Bot,
    msg: Message,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    let tg_id = msg.chat.id.0;
    let Some(text) = msg.text() else {
        return Ok(());
    };
    let is_admin = state.cfg.is_admin(tg_id);

    // ForceReply continuations: each prompt message carries a marker the
    // reply is matched against.
    if let Some(reply) = msg.reply_to_message() {
        if let Some(reply_text) = reply.text() {
            if reply_text.contains("Enter your promo code") {
                handle_redeem(&bot, &msg, &state, tg_id, text.trim()).await;
                return Ok(());
            }

            if reply_text.contains("Describe your request") {
                handle_submit_request(&bot, &msg, &state, tg_id, text.trim()).await;
                return Ok(());
            }

            if is_admin && reply_text.contains("Replying to request") {
                handle_admin_reply(&bot, &msg, &state, reply_text, text).await;
                return Ok(());
            }

            if is_admin && reply_text.contains("New promo code") {
                handle_add_promo(&bot, &msg, &state, text).await;
                return Ok(());
            }

            if is_admin && reply_text.contains("Grant subscription") {
                handle_grant(&bot, &msg, &state, text).await;
                return Ok(());
            }
        }
    }

    match text {
        "/start" => {
            let (greeting, keyboard) = if is_admin {
                (
                    "👋 <b>Hello, administrator!</b>\n\nPick an action below.",
                    admin_menu(),
                )
            } else {
                (
                    "👋 <b>Welcome!</b>\n\nRedeem a promo code or send a request to get your VPN subscription.",
                    user_menu(),
                )
            };
            let _ = bot
                .send_message(msg.chat.id, greeting)
                .parse_mode(ParseMode::Html)
                .reply_markup(keyboard)
                .await
                .map_err(|e| error!("failed to send greeting: {}", e));
        }

        "🎟 Redeem Promo Code" | "/redeem" => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "🎟 Enter your promo code as a reply to this message.",
                )
                .reply_markup(ForceReply::new().selective())
                .await;
        }

        "📨 Request Subscription" | "/request" => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "📨 Describe your request as a reply to this message \
                     (for example: device count and preferred duration).",
                )
                .reply_markup(ForceReply::new().selective())
                .await;
        }

        "📊 My Subscription" | "/status" => {
            handle_status(&bot, &msg, &state, tg_id).await;
        }

        "📋 Pending Requests" if is_admin => {
            handle_pending_requests(&bot, &msg, &state).await;
        }

        "🎟 Promo Codes" if is_admin => {
            crate::bot::handlers::callback::send_promo_list(&bot, msg.chat.id, &state).await;
        }

        "🛠 Grant Subscription" if is_admin => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "🛠 Grant subscription\n\nReply with: USER_ID DEVICES DAYS (e.g. 123456 2 30)",
                )
                .reply_markup(ForceReply::new().selective())
                .await;
        }

        "⬅️ User Menu" => {
            let _ = bot
                .send_message(msg.chat.id, "Back to the main menu.")
                .reply_markup(user_menu())
                .await;
        }

        _ => {
            // Unknown text outside a prompt flow is ignored.
        }
    }

    Ok(())
}

async fn handle_redeem(bot: &Bot, msg: &Message, state: &AppState, tg_id: i64, code: &str) {
    if state.subscriptions.apply_promocode(tg_id, code).await {
        let _ = bot
            .send_message(
                msg.chat.id,
                "✅ Promo code accepted! Your subscription is active.",
            )
            .reply_markup(user_menu())
            .await;
    } else {
        let _ = bot
            .send_message(
                msg.chat.id,
                "❌ This promo code is invalid or already used. \
                 Try another one, or send a request to the administrator.",
            )
            .reply_markup(user_menu())
            .await;
    }
}

async fn handle_submit_request(bot: &Bot, msg: &Message, state: &AppState, tg_id: i64, text: &str) {
    let mut details = serde_json::Map::new();
    details.insert("message".into(), serde_json::Value::String(text.into()));

    match state.workflow.submit_request(tg_id, details).await {
        Some(request_id) => {
            info!("request {} submitted by user {}", request_id, tg_id);
            let _ = bot
                .send_message(
                    msg.chat.id,
                    format!(
                        "✅ Your request {} has been sent to the administrator. \
                         You will be notified once it is reviewed.",
                        short_id(&request_id)
                    ),
                )
                .reply_markup(user_menu())
                .await;
        }
        None => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "❌ Could not record your request. Please try again later.",
                )
                .reply_markup(user_menu())
                .await;
        }
    }
}

async fn handle_status(bot: &Bot, msg: &Message, state: &AppState, tg_id: i64) {
    match state.subscriptions.client_summary(tg_id).await {
        Some(summary) => {
            let text = format!(
                "📊 Subscription status\n\n\
                 Devices: {}\n\
                 Traffic total: {}\n\
                 Traffic remaining: {}\n\
                 Traffic used: {} (↑ {} / ↓ {})\n\
                 Expires: {}",
                format_devices(summary.max_devices),
                format_gb(summary.traffic_total),
                format_gb(summary.traffic_remaining),
                format_gb(summary.traffic_used),
                format_gb(summary.traffic_up),
                format_gb(summary.traffic_down),
                format_timestamp(summary.expiry_time),
            );
            let _ = bot
                .send_message(msg.chat.id, text)
                .reply_markup(user_menu())
                .await;
        }
        None => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "❌ You have no active subscription, or the panel is unavailable right now.",
                )
                .reply_markup(user_menu())
                .await;
        }
    }
}

async fn handle_pending_requests(bot: &Bot, msg: &Message, state: &AppState) {
    let pending = state.requests.list(Some(RequestStatus::Pending)).await;
    if pending.is_empty() {
        let _ = bot
            .send_message(msg.chat.id, "📭 No pending requests.")
            .reply_markup(admin_menu())
            .await;
        return;
    }

    let mut text = "📋 Pending requests\n\n".to_string();
    for req in &pending {
        let details = req
            .details
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("(no details)");
        text.push_str(&format!(
            "🔹 {}\n👤 User: {}\n📝 {}\n📅 {}\n\n",
            req.request_id,
            req.user_id,
            details,
            format_timestamp(req.timestamp),
        ));
    }

    let _ = bot
        .send_message(msg.chat.id, text)
        .reply_markup(pending_requests_keyboard(&pending))
        .await
        .map_err(|e| error!("failed to list requests: {}", e));
}

async fn handle_admin_reply(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    prompt_text: &str,
    response: &str,
) {
    // The prompt carries the id right after the marker.
    let request_id = prompt_text
        .split("Replying to request ")
        .nth(1)
        .and_then(|rest| rest.split_whitespace().next())
        .unwrap_or_default();

    if state.workflow.respond(request_id, response).await {
        let _ = bot
            .send_message(
                msg.chat.id,
                "✅ Reply delivered, request marked as completed.",
            )
            .reply_markup(admin_menu())
            .await;
    } else {
        let _ = bot
            .send_message(
                msg.chat.id,
                "❌ Could not deliver the reply. The request stays pending.",
            )
            .reply_markup(admin_menu())
            .await;
    }
}

async fn handle_add_promo(bot: &Bot, msg: &Message, state: &AppState, text: &str) {
    let mut parts = text.split_whitespace();
    let (code, days) = match (parts.next(), parts.next().and_then(|d| d.parse::<i64>().ok())) {
        (Some(code), Some(days)) if days > 0 => (code, days),
        _ => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "❌ Expected: CODE DURATION_DAYS (e.g. WINTER30 30)",
                )
                .reply_markup(admin_menu())
                .await;
            return;
        }
    };

    if state.promos.add(code, days).await {
        let _ = bot
            .send_message(
                msg.chat.id,
                format!("✅ Promo code {} added for {} days.", code, days),
            )
            .reply_markup(admin_menu())
            .await;
    } else {
        let _ = bot
            .send_message(
                msg.chat.id,
                format!("❌ Promo code {} already exists.", code),
            )
            .reply_markup(admin_menu())
            .await;
    }
}

async fn handle_grant(bot: &Bot, msg: &Message, state: &AppState, text: &str) {
    let mut parts = text.split_whitespace();
    let parsed = (
        parts.next().and_then(|v| v.parse::<i64>().ok()),
        parts.next().and_then(|v| v.parse::<i64>().ok()),
        parts.next().and_then(|v| v.parse::<i64>().ok()),
    );
    let (user_id, devices, days) = match parsed {
        (Some(user_id), Some(devices), Some(days)) if days > 0 => (user_id, devices, days),
        _ => {
            let _ = bot
                .send_message(
                    msg.chat.id,
                    "❌ Expected: USER_ID DEVICES DAYS (e.g. 123456 2 30)",
                )
                .reply_markup(admin_menu())
                .await;
            return;
        }
    };

    if state
        .subscriptions
        .provision_or_extend(user_id, devices, days)
        .await
    {
        let _ = bot
            .send_message(
                msg.chat.id,
                format!(
                    "✅ Subscription granted to {}: {} devices for {} days.",
                    user_id, devices, days
                ),
            )
            .reply_markup(admin_menu())
            .await;
        // Courtesy note to the user; the grant stands even if it fails.
        let _ = bot
            .send_message(
                ChatId(user_id),
                format!(
                    "🎉 Your VPN subscription is ready: {} devices for {} days.",
                    devices, days
                ),
            )
            .await
            .map_err(|e| error!("failed to notify user {}: {}", user_id, e));
    } else {
        let _ = bot
            .send_message(
                msg.chat.id,
                "❌ Provisioning failed. Check the panel logs and try again.",
            )
            .reply_markup(admin_menu())
            .await;
    }
}
