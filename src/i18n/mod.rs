//! Internationalization (i18n) module.
//!
//! Provides localized strings for CLI output and rendered mail views.
//! English is the default language; Simplified Chinese is available as an
//! alternative.

use std::sync::OnceLock;

static CURRENT_LANG: OnceLock<Lang> = OnceLock::new();

/// Supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lang {
    /// English (default)
    En,
    /// Simplified Chinese
    Zh,
}

impl Lang {
    /// Parse a language code string (e.g. "en", "zh", "en_US", "zh_CN.UTF-8").
    /// Returns `None` for unrecognized codes.
    pub fn from_code(code: &str) -> Option<Self> {
        let normalized = code.to_lowercase();
        let prefix = normalized.split(['_', '-', '.']).next().unwrap_or("");
        match prefix {
            "en" => Some(Self::En),
            "zh" => Some(Self::Zh),
            _ => None,
        }
    }

    /// Return the ISO 639-1 code for this language.
    pub fn code(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }
}

/// Initialize the global language. Call once at startup.
/// If already initialized, this is a no-op.
pub fn set_lang(lang: Lang) {
    let _ = CURRENT_LANG.set(lang);
}

/// Get the currently configured language (defaults to English).
pub fn lang() -> Lang {
    CURRENT_LANG.get().copied().unwrap_or(Lang::En)
}

/// Detect language from `MAILSHARE_LANG`, then `LC_MESSAGES` / `LANG`.
pub fn detect_system_lang() -> Lang {
    std::env::var("MAILSHARE_LANG")
        .ok()
        .and_then(|v| Lang::from_code(&v))
        .or_else(|| {
            std::env::var("LC_MESSAGES")
                .ok()
                .and_then(|v| Lang::from_code(&v))
        })
        .or_else(|| std::env::var("LANG").ok().and_then(|v| Lang::from_code(&v)))
        .unwrap_or(Lang::En)
}

/// Macro for defining translatable message functions.
/// Each function returns a `&'static str` based on the current language.
macro_rules! msg {
    ($name:ident, $en:expr, $zh:expr) => {
        /// Returns a localized string for the current language.
        pub fn $name() -> &'static str {
            match lang() {
                Lang::En => $en,
                Lang::Zh => $zh,
            }
        }
    };
}

// ── General ──────────────────────────────────────────────────────

msg!(app_name, "mailshare", "mailshare");
msg!(
    app_about,
    "mailshare: share read-only access to a mailbox through revocable tokens, and decode what comes back.",
    "mailshare：通过可撤销的 Token 分享邮箱的只读访问，并解码返回的邮件。"
);
msg!(
    app_long_about,
    "mailshare: share read-only access to a mailbox through revocable tokens.\nManages distribution tokens, builds upstream mail API requests,\nand decodes MIME messages (multipart, Base64, quoted-printable, RFC 2047).",
    "mailshare：通过可撤销的 Token 分享邮箱的只读访问。\n管理分发 Token，构建上游邮件 API 请求，\n并解码 MIME 邮件（multipart、Base64、quoted-printable、RFC 2047）。"
);

// ── CLI help strings ─────────────────────────────────────────────

msg!(
    help_cmd_extract,
    "Print the plain or HTML body of an .eml file",
    "输出 .eml 文件的纯文本或 HTML 正文"
);
msg!(
    help_cmd_headers,
    "Show decoded Subject, From and To of an .eml file",
    "显示 .eml 文件解码后的主题、发件人和收件人"
);
msg!(help_cmd_show, "Show an .eml file", "显示 .eml 文件");
msg!(
    help_cmd_mails,
    "Render an upstream mail list response (file or '-' for stdin)",
    "渲染上游邮件列表响应（文件，或用 '-' 表示标准输入）"
);
msg!(help_cmd_token, "Manage distribution tokens", "管理分发 Token");
msg!(help_cmd_token_create, "Create a token", "创建 Token");
msg!(help_cmd_token_list, "List tokens", "列出 Token");
msg!(help_cmd_token_delete, "Delete a token", "删除 Token");
msg!(help_cmd_token_update, "Update a token", "更新 Token");
msg!(
    help_cmd_token_check,
    "Check a token as a viewer would (counts one access)",
    "以查看者身份校验 Token（计一次访问）"
);
msg!(
    help_cmd_token_request,
    "Authorize a token and print its upstream mail request (counts one access)",
    "校验 Token 并输出其上游邮件请求（计一次访问）"
);
msg!(
    help_cmd_completions,
    "Generate shell completions",
    "生成 shell 补全脚本"
);
msg!(help_cmd_manpage, "Generate a man page", "生成 man 手册页");
msg!(
    app_after_help,
    "Configuration: $MAILSHARE_CONFIG or <config dir>/mailshare/config.toml",
    "配置文件：$MAILSHARE_CONFIG 或 <配置目录>/mailshare/config.toml"
);

// ── Mail views ──────────────────────────────────────────────────

msg!(label_subject, "Subject", "主题");
msg!(label_from, "From", "发件人");
msg!(label_to, "To", "收件人");
msg!(label_date, "Date", "日期");
msg!(label_size, "Size", "大小");
msg!(no_subject, "(no subject)", "(无主题)");
msg!(unknown_sender, "Unknown sender", "未知发件人");
msg!(no_text_content, "(No text content)", "(无正文内容)");
msg!(
    raw_preview_title,
    "Raw message (could not decode body)",
    "原始邮件（无法解析正文）"
);
msg!(no_messages, "No messages", "暂无邮件");
msg!(messages_count, "message(s)", "封邮件");

// ── Tokens ──────────────────────────────────────────────────────

msg!(col_id, "ID", "ID");
msg!(col_email, "Mailbox", "邮箱");
msg!(col_description, "Description", "描述");
msg!(col_created, "Created", "创建时间");
msg!(col_expires, "Expires", "过期时间");
msg!(col_status, "Status", "状态");
msg!(col_access, "Access", "访问次数");
msg!(status_active, "active", "正常");
msg!(status_disabled, "disabled", "已禁用");
msg!(status_expired, "expired", "已过期");
msg!(never, "never", "永不");
msg!(no_tokens, "No tokens", "暂无 Token");
msg!(msg_token_created, "Token created", "Token 已创建");
msg!(msg_token_deleted, "Token deleted", "Token 已删除");
msg!(msg_token_updated, "Token updated", "Token 已更新");
msg!(msg_token_valid, "Token is valid", "Token 有效");
msg!(msg_share_link, "Share link", "分享链接");

// ── Errors ───────────────────────────────────────────────────────

msg!(err_file_not_found, "File not found", "文件不存在");
msg!(err_token_not_found, "Token not found", "Token 不存在");
msg!(err_token_invalid, "Token is invalid", "Token 无效或已过期");
msg!(err_token_expired, "Token has expired", "Token 已过期");
msg!(err_token_disabled, "Token has been disabled", "Token 已被禁用");
msg!(
    err_bad_expiry,
    "Invalid expiry time (use RFC 3339 or YYYY-MM-DD HH:MM:SS)",
    "过期时间格式无效（请使用 RFC 3339 或 YYYY-MM-DD HH:MM:SS）"
);
