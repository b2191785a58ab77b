use once_cell::sync::Lazy;
use url::Url;

pub static RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to build Tokio runtime")
});

pub fn block_on<F: std::future::Future>(fut: F) -> F::Output {
    RUNTIME.block_on(fut)
}

pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

/// In-app route of a conversation.
pub fn chat_route(chat_id: &str) -> String {
    format!("/chats/{}", chat_id)
}

/// Shareable `<origin>/chats/<id>` link.
pub fn share_url(origin: &str, chat_id: &str) -> Result<Url, url::ParseError> {
    let origin = Url::parse(&normalize_url(origin))?;
    let mut url = origin.join("/chats/")?;
    url.path_segments_mut()
        .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
        .pop_if_empty()
        .push(chat_id);
    Ok(url)
}
