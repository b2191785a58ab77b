/// Signals for whoever hosts the chat list (window, router, terminal).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SidebarEvent {
    /// A conversation was created; select it and open its route.
    Navigate { chat_id: String, route: String },
    /// Creating a conversation failed; show `message` as an alert.
    CreationFailed { message: String },
}
