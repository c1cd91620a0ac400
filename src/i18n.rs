use std::collections::HashMap;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use lazy_static::lazy_static;

pub const DEFAULT_LANGUAGE: &str = "en";

lazy_static! {
    static ref CATALOG: HashMap<&'static str, HashMap<&'static str, &'static str>> = {
        let mut en = HashMap::new();
        en.insert("invalid_credentials", "Incorrect email or password");
        en.insert("user_not_found", "User not found");
        en.insert("email_exists", "Email already registered");
        en.insert(
            "weak_password",
            "Password must be at least 8 characters long and contain at least one uppercase letter, one lowercase letter, one number and one special character",
        );
        en.insert("password_recovery_sent", "Password recovery email sent");
        en.insert("password_updated", "Password updated successfully");
        en.insert("invalid_token", "Invalid or expired token");
        en.insert("too_many_requests", "Too many requests. Please try again later.");
        en.insert("inactive_user", "This account is inactive");
        en.insert(
            "email_send_error",
            "Error sending password recovery email. Please try again later.",
        );
        en.insert(
            "password_recovery_error",
            "An error occurred during password recovery. Please try again later.",
        );

        let mut pt_br = HashMap::new();
        pt_br.insert("invalid_credentials", "Email ou senha incorretos");
        pt_br.insert("user_not_found", "Usuário não encontrado");
        pt_br.insert("email_exists", "Email já cadastrado");
        pt_br.insert(
            "weak_password",
            "A senha deve ter pelo menos 8 caracteres e conter pelo menos uma letra maiúscula, uma letra minúscula, um número e um caractere especial",
        );
        pt_br.insert("password_recovery_sent", "Email de recuperação de senha enviado");
        pt_br.insert("password_updated", "Senha atualizada com sucesso");
        pt_br.insert("invalid_token", "Token inválido ou expirado");
        pt_br.insert(
            "too_many_requests",
            "Muitas requisições. Por favor, tente novamente mais tarde.",
        );
        pt_br.insert("inactive_user", "Esta conta está inativa");
        pt_br.insert(
            "email_send_error",
            "Erro ao enviar email de recuperação de senha. Por favor, tente novamente mais tarde.",
        );
        pt_br.insert(
            "password_recovery_error",
            "Ocorreu um erro durante a recuperação de senha. Por favor, tente novamente mais tarde.",
        );

        let mut catalog = HashMap::new();
        catalog.insert("en", en);
        catalog.insert("pt-br", pt_br);
        catalog
    };
}

/// Looks up `key` for `language`. Unknown languages fall back to English,
/// and a key missing from every catalog is echoed back as-is.
pub fn message<'a>(language: &str, key: &'a str) -> &'a str {
    let catalog = CATALOG.get(language).unwrap_or(&CATALOG[DEFAULT_LANGUAGE]);
    catalog
        .get(key)
        .or_else(|| CATALOG[DEFAULT_LANGUAGE].get(key))
        .copied()
        .unwrap_or(key)
}

/// Request language, read from the `Accept-Language` header and lowercased.
#[derive(Debug, Clone)]
pub struct Lang(pub String);

#[async_trait]
impl<S> FromRequestParts<S> for Lang
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let language = parts
            .headers
            .get(axum::http::header::ACCEPT_LANGUAGE)
            .and_then(|h| h.to_str().ok())
            .map(|v| v.to_ascii_lowercase())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        Ok(Lang(language))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_message_per_language() {
        assert_eq!(message("en", "user_not_found"), "User not found");
        assert_eq!(message("pt-br", "user_not_found"), "Usuário não encontrado");
    }

    #[test]
    fn unknown_language_falls_back_to_english() {
        assert_eq!(message("fr", "email_exists"), "Email already registered");
        assert_eq!(message("", "invalid_token"), "Invalid or expired token");
    }

    #[test]
    fn unknown_key_is_echoed() {
        assert_eq!(message("en", "no_such_key"), "no_such_key");
        assert_eq!(message("pt-br", "no_such_key"), "no_such_key");
    }
}
