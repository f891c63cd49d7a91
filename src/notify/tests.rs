#[cfg(test)]
mod tests {
    use crate::config::TelegramConfig;
    use crate::error::NotifyError;
    use crate::notify::message::{diagnostic_commands, render_test_message};
    use crate::notify::{escape_html, Alert, NotificationKind, Notifier, OutgoingMessage, TelegramNotifier};
    use crate::systemd::MonitoredUnit;
    use chrono::{Local, TimeZone, Utc};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn alert_for<'a>(kind: NotificationKind, unit: &'a MonitoredUnit, composite: &'a str) -> Alert<'a> {
        let at_utc = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        Alert {
            kind,
            host: "web-01",
            unit,
            composite,
            at_utc,
            at_local: at_utc.with_timezone(&Local),
        }
    }

    #[test]
    fn test_down_message_contents() {
        let unit = MonitoredUnit::System { name: "nginx.service".to_string() };
        let text = alert_for(NotificationKind::Down, &unit, "failed/dead/exit-code").render();

        assert!(text.contains("DOWN"));
        assert!(text.contains("web-01"));
        assert!(text.contains("nginx.service"));
        assert!(text.contains("failed/dead/exit-code"));
        assert!(text.contains("2024-03-01 12:30:00 UTC"));
        assert!(text.contains("systemctl status nginx.service"));
        assert!(text.contains("journalctl -u nginx.service"));
    }

    #[test]
    fn test_recovered_and_reminder_have_no_diagnostics() {
        let unit = MonitoredUnit::System { name: "nginx.service".to_string() };

        let text = alert_for(NotificationKind::Recovered, &unit, "active/running/success").render();
        assert!(text.contains("RECOVERED"));
        assert!(text.contains("active/running/success"));
        assert!(!text.contains("Diagnostics"));

        let text = alert_for(NotificationKind::StillProblematic, &unit, "failed/dead/exit-code").render();
        assert!(text.contains("STILL PROBLEMATIC"));
        assert!(!text.contains("Diagnostics"));
    }

    #[test]
    fn test_user_unit_diagnostics_use_unscoped_name() {
        let unit = MonitoredUnit::User {
            name: "syncthing.service".to_string(),
            owner: Some("alice".to_string()),
        };
        let commands = diagnostic_commands(&unit);
        assert_eq!(commands[0], "systemctl --user -M alice@ status syncthing.service");
        assert!(commands[1].contains("--user-unit syncthing.service"));
        assert!(commands.iter().all(|c| !c.contains("user:syncthing")));

        let text = alert_for(NotificationKind::Down, &unit, "failed/dead/signal").render();
        // The identifier keeps its scope prefix
        assert!(text.contains("<code>user:syncthing.service</code>"));
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a<b>&c"), "a&lt;b&gt;&amp;c");
        assert_eq!(escape_html("active/running/success"), "active/running/success");
    }

    #[test]
    fn test_host_label_is_escaped() {
        let unit = MonitoredUnit::System { name: "x.service".to_string() };
        let mut alert = alert_for(NotificationKind::Recovered, &unit, "active/running/success");
        alert.host = "<lab>";
        assert!(alert.render().contains("&lt;lab&gt;"));
        assert!(render_test_message("<lab>", Utc::now()).contains("&lt;lab&gt;"));
    }

    #[test]
    fn test_outgoing_message_urgency() {
        let unit = MonitoredUnit::System { name: "x.service".to_string() };
        let down = alert_for(NotificationKind::Down, &unit, "failed/dead/exit-code");
        assert!(OutgoingMessage::from(&down).urgent);

        let recovered = alert_for(NotificationKind::Recovered, &unit, "active/running/success");
        assert!(!OutgoingMessage::from(&recovered).urgent);
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            TelegramNotifier::endpoint("https://api.telegram.org/", "123:abc"),
            "https://api.telegram.org/bot123:abc/sendMessage"
        );
    }

    /// Serve one canned HTTP response and hand back the raw request
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);

                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "{}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}", addr), handle)
    }

    fn telegram_config(api_base: String) -> TelegramConfig {
        TelegramConfig {
            bot_token: "123:abc".to_string(),
            chat_id: "-1001".to_string(),
            api_base,
            timeout_secs: 5,
            silent: true,
        }
    }

    #[tokio::test]
    async fn test_telegram_send_success() {
        let (base, server) = serve_once("HTTP/1.1 200 OK", r#"{"ok":true,"result":{}}"#).await;
        let notifier = TelegramNotifier::new(&telegram_config(base)).unwrap();

        let result = notifier
            .send(&OutgoingMessage::new("<b>RECOVERED</b> active/running/success", false))
            .await;
        assert!(result.is_ok());

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /bot123:abc/sendMessage"));
        assert!(request.contains("\"chat_id\":\"-1001\""));
        assert!(request.contains("active/running/success"));
        assert!(request.contains("\"parse_mode\":\"HTML\""));
        // Silent mode applies to non-urgent messages
        assert!(request.contains("\"disable_notification\":true"));
    }

    #[tokio::test]
    async fn test_telegram_api_rejection() {
        let (base, server) = serve_once(
            "HTTP/1.1 400 Bad Request",
            r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
        )
        .await;
        let notifier = TelegramNotifier::new(&telegram_config(base)).unwrap();

        let err = notifier.send(&OutgoingMessage::new("hi", true)).await.unwrap_err();
        match err {
            NotifyError::Rejected { status, description } => {
                assert_eq!(status, 400);
                assert!(description.contains("chat not found"));
            }
            other => panic!("unexpected error: {}", other),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_telegram_transport_failure_hides_token() {
        // Bind then drop to get a port nobody listens on
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let notifier = TelegramNotifier::new(&telegram_config(format!("http://{}", addr))).unwrap();

        let err = notifier.send(&OutgoingMessage::new("hi", true)).await.unwrap_err();
        assert!(matches!(err, NotifyError::Transport(_)));
        assert!(!err.to_string().contains("123:abc"));
    }
}
