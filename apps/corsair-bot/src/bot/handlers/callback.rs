use teloxide::prelude::*;
use teloxide::types::{ChatId, ForceReply};
use tracing::info;

use crate::bot::keyboards::promo_list_keyboard;
use crate::bot::utils::format_timestamp;
use crate::state::AppState;

pub async fn callback_handler(
    bot: Bot,
    q: CallbackQuery,
    state: AppState,
) -> Result<(), teloxide::RequestError> {
    info!("Received callback: {:?}", q.data);
    let callback_id = q.id.clone();
    let tg_id = q.from.id.0 as i64;
    let is_admin = state.cfg.is_admin(tg_id);

    let Some(data) = q.data else {
        return Ok(());
    };
    let chat_id = q.message.as_ref().map(|m| m.chat().id);

    if !is_admin {
        // Every callback below is an admin surface.
        let _ = bot
            .answer_callback_query(callback_id)
            .text("❌ You are not allowed to do that.")
            .show_alert(true)
            .await;
        return Ok(());
    }

    match data.as_str() {
        "promo_add" => {
            let _ = bot.answer_callback_query(callback_id).await;
            if let Some(chat_id) = chat_id {
                let _ = bot
                    .send_message(
                        chat_id,
                        "➕ New promo code\n\nReply with: CODE DURATION_DAYS (e.g. WINTER30 30)",
                    )
                    .reply_markup(ForceReply::new().selective())
                    .await;
            }
        }

        reply if reply.starts_with("req_reply_") => {
            let request_id = reply.trim_start_matches("req_reply_");
            match state.requests.get(request_id).await {
                Some(req) => {
                    let _ = bot.answer_callback_query(callback_id).await;
                    if let Some(chat_id) = chat_id {
                        let details = req
                            .details
                            .get("message")
                            .and_then(|v| v.as_str())
                            .unwrap_or("(no details)");
                        let _ = bot
                            .send_message(
                                chat_id,
                                format!(
                                    "💬 Replying to request {}\n\
                                     👤 User: {}\n📝 {}\n📅 {}\n\n\
                                     Send the message for the user as a reply to this one.",
                                    req.request_id,
                                    req.user_id,
                                    details,
                                    format_timestamp(req.timestamp),
                                ),
                            )
                            .reply_markup(ForceReply::new().selective())
                            .await;
                    }
                }
                None => {
                    let _ = bot
                        .answer_callback_query(callback_id)
                        .text("❌ Request not found.")
                        .show_alert(true)
                        .await;
                }
            }
        }

        off if off.starts_with("promo_off_") => {
            let code = off.trim_start_matches("promo_off_");
            let note = if state.promos.deactivate(code).await {
                format!("🚫 {} deactivated.", code)
            } else {
                format!("❌ {} is already inactive or unknown.", code)
            };
            let _ = bot.answer_callback_query(callback_id).text(note).await;
            if let Some(chat_id) = chat_id {
                send_promo_list(&bot, chat_id, &state).await;
            }
        }

        del if del.starts_with("promo_del_") => {
            let code = del.trim_start_matches("promo_del_");
            let note = if state.promos.remove(code).await {
                format!("🗑 {} deleted.", code)
            } else {
                format!("❌ {} not found.", code)
            };
            let _ = bot.answer_callback_query(callback_id).text(note).await;
            if let Some(chat_id) = chat_id {
                send_promo_list(&bot, chat_id, &state).await;
            }
        }

        _ => {
            let _ = bot.answer_callback_query(callback_id).await;
        }
    }

    Ok(())
}

/// Shared by the menu button and the post-action refresh.
pub async fn send_promo_list(bot: &Bot, chat_id: ChatId, state: &AppState) {
    let codes = state.promos.list_all().await;
    if codes.is_empty() {
        let _ = bot
            .send_message(chat_id, "🎟 No promo codes yet.")
            .reply_markup(promo_list_keyboard(&codes))
            .await;
        return;
    }

    let mut text = "🎟 Promo codes\n\n".to_string();
    for promo in &codes {
        let status = if promo.active { "active" } else { "spent" };
        text.push_str(&format!(
            "• {}: {} days ({})\n",
            promo.code, promo.duration_days, status
        ));
    }

    let _ = bot
        .send_message(chat_id, text)
        .reply_markup(promo_list_keyboard(&codes))
        .await;
}
