use url::form_urlencoded;
use url::Url;

use crate::models::CallbackParams;

/// Extracts the `state` parameter from a callback URL, looking at the query
/// first and the fragment second (implicit flows return in the fragment).
pub fn get_state_param(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    pairs_of(&parsed)
        .into_iter()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v)
}

/// True when the URL carries recognized protocol response parameters and
/// should be routed through the callback pipeline.
pub fn is_callback(url: &str) -> bool {
    callback_params(url).has_response()
}

/// Extracts all recognized response parameters from a callback URL.
/// Query and fragment are merged; a fragment value wins over a query value
/// of the same name.
pub fn callback_params(url: &str) -> CallbackParams {
    let mut params = CallbackParams::default();
    let parsed = match Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return params,
    };

    for (key, value) in pairs_of(&parsed) {
        match key.as_str() {
            "code" => params.code = Some(value),
            "id_token" => params.id_token = Some(value),
            "access_token" => params.access_token = Some(value),
            "expires_in" => params.expires_in = Some(value),
            "state" => params.state = Some(value),
            "session_state" => params.session_state = Some(value),
            "error" => params.error = Some(value),
            "error_description" => params.error_description = Some(value),
            _ => {}
        }
    }

    params
}

fn pairs_of(url: &Url) -> Vec<(String, String)> {
    let mut pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if let Some(fragment) = url.fragment() {
        pairs.extend(
            form_urlencoded::parse(fragment.as_bytes())
                .map(|(k, v)| (k.into_owned(), v.into_owned())),
        );
    }

    pairs
}
