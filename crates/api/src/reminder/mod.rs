mod acknowledge_reminder;
mod cancel_reminder;
mod create_reminder;
mod get_failed_reminders;
mod get_reminders;
pub mod mark_reminder;
mod send_welcome;
mod snooze_reminder;
mod subscribers;
mod update_reminder;

use acknowledge_reminder::acknowledge_reminder_controller;
use actix_web::web;
use cancel_reminder::cancel_reminder_controller;
pub use cancel_reminder::{CancelReminderUseCase, CancelTarget};
use create_reminder::create_reminder_controller;
pub use create_reminder::CreateReminderUseCase;
use get_failed_reminders::get_failed_reminders_controller;
use get_reminders::get_reminders_controller;
use send_welcome::send_welcome_controller;
use snooze_reminder::snooze_reminder_controller;
use update_reminder::update_reminder_controller;

/// Longest allowed user supplied message of a `Reminder`
pub const MAX_CUSTOM_MESSAGE_LENGTH: usize = 500;

fn is_valid_custom_message(custom_message: &Option<String>) -> bool {
    match custom_message {
        Some(msg) => msg.chars().count() <= MAX_CUSTOM_MESSAGE_LENGTH,
        None => true,
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/reminders", web::post().to(create_reminder_controller));
    cfg.route("/reminders", web::get().to(get_reminders_controller));
    cfg.route(
        "/reminders/{event_id}",
        web::put().to(update_reminder_controller),
    );
    cfg.route(
        "/reminders/{event_id}",
        web::delete().to(cancel_reminder_controller),
    );
    cfg.route(
        "/reminders/{event_id}/snooze",
        web::post().to(snooze_reminder_controller),
    );
    cfg.route(
        "/reminders/{event_id}/acknowledge",
        web::post().to(acknowledge_reminder_controller),
    );

    cfg.route(
        "/admin/reminders/failed",
        web::get().to(get_failed_reminders_controller),
    );
    cfg.route(
        "/admin/users/{user_id}/welcome",
        web::post().to(send_welcome_controller),
    );
}
