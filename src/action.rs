use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Bytes left untouched by the browser's `encodeURI`.
const URI_RESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// Escape a whole URL the way `encodeURI` does: structural characters
/// survive, everything else is percent-encoded as UTF-8.
pub fn encode_uri(raw: &str) -> String {
    utf8_percent_encode(raw, URI_RESERVED).to_string()
}

/// Pixel position of a pointer click relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    pub client_x: i32,
    pub client_y: i32,
}

impl PointerEvent {
    pub fn new(client_x: i32, client_y: i32) -> Self {
        Self { client_x, client_y }
    }
}

/// A user interaction, sent as `GET /?action=<name>` plus its parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Click { x: i32, y: i32 },
    /// A bare action without parameters (`undo`, `redo`, `expand_all`, ...).
    Named(String),
    SetSymbol(String),
    SetTemplate(String),
    SetMode(String),
}

impl Action {
    pub fn click(event: PointerEvent) -> Self {
        Action::Click {
            x: event.client_x,
            y: event.client_y,
        }
    }

    pub fn undo() -> Self {
        Action::Named("undo".to_string())
    }

    pub fn redo() -> Self {
        Action::Named("redo".to_string())
    }

    pub fn expand_all() -> Self {
        Action::Named("expand_all".to_string())
    }

    pub fn name(&self) -> &str {
        match self {
            Action::Click { .. } => "click",
            Action::Named(name) => name,
            Action::SetSymbol(_) => "setsymbol",
            Action::SetTemplate(_) => "settemplate",
            Action::SetMode(_) => "setmode",
        }
    }

    /// Action-specific query parameters, in wire order.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        match self {
            Action::Click { x, y } => vec![("x", x.to_string()), ("y", y.to_string())],
            Action::Named(_) => Vec::new(),
            Action::SetSymbol(symbol) => vec![("symbol", symbol.clone())],
            Action::SetTemplate(temp) => vec![("temp", temp.clone())],
            Action::SetMode(mode) => vec![("mode", mode.clone())],
        }
    }

    /// The query before escaping: `/?action=<name>[&key=value...]`.
    pub fn raw_url(&self) -> String {
        let mut url = format!("/?action={}", self.name());
        for (key, value) in self.params() {
            url.push('&');
            url.push_str(key);
            url.push('=');
            url.push_str(&value);
        }
        url
    }

    /// The escaped URL that goes on the wire.
    pub fn to_url(&self) -> String {
        encode_uri(&self.raw_url())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn click_carries_pointer_coordinates() {
        let action = Action::click(PointerEvent::new(10, 20));
        assert_eq!(action.to_url(), "/?action=click&x=10&y=20");
    }

    #[test]
    fn each_action_builds_its_documented_url() {
        let cases = [
            (Action::undo(), "/?action=undo"),
            (Action::redo(), "/?action=redo"),
            (Action::expand_all(), "/?action=expand_all"),
            (Action::SetSymbol("Cl".into()), "/?action=setsymbol&symbol=Cl"),
            (
                Action::SetTemplate("benzene".into()),
                "/?action=settemplate&temp=benzene",
            ),
            (Action::SetMode("draw".into()), "/?action=setmode&mode=draw"),
        ];
        for (action, expected) in cases {
            assert_eq!(action.to_url(), expected);
        }
    }

    #[test]
    fn negative_coordinates_keep_their_sign() {
        let action = Action::click(PointerEvent::new(-3, 0));
        assert_eq!(action.to_url(), "/?action=click&x=-3&y=0");
    }

    #[test]
    fn encode_uri_keeps_structure_and_escapes_the_rest() {
        assert_eq!(
            encode_uri("/?action=setsymbol&symbol=C O"),
            "/?action=setsymbol&symbol=C%20O"
        );
        assert_eq!(encode_uri("a+b=c&d#e"), "a+b=c&d#e");
        assert_eq!(encode_uri("100%"), "100%25");
        assert_eq!(encode_uri("[x]"), "%5Bx%5D");
    }

    #[test]
    fn encode_uri_escapes_utf8_bytes() {
        assert_eq!(encode_uri("Å"), "%C3%85");
    }

    #[test]
    fn user_supplied_ampersand_is_not_escaped() {
        // encodeURI leaves '&' alone, so a symbol containing one splits the query.
        let action = Action::SetSymbol("a&b".into());
        assert_eq!(action.to_url(), "/?action=setsymbol&symbol=a&b");
    }
}
