/// Clean user-supplied free text using the ammonia library.
///
/// Event descriptions and ticket notes are entered by arbitrary users and
/// redisplayed to everyone browsing the marketplace. Sanitizing on write
/// strips dangerous tags (<script>, <iframe>) and attributes (onclick)
/// while preserving harmless formatting, as a fail-safe against stored XSS
/// in clients that render these fields as HTML.
pub fn clean_text(input: &str) -> String {
    ammonia::clean(input)
}
