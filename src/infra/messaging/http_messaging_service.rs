use crate::config::Config;
use crate::domain::models::message::{Channel, OutboundMessage};
use crate::domain::ports::NotificationService;
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, error};

/// Bearer-token HTTP gateways for SMS, chat notices and email.
pub struct HttpMessagingService {
    client: Client,
    sms_url: String,
    sms_token: String,
    sms_sender: String,
    chat_url: Option<String>,
    chat_template_id: Option<String>,
    mail_url: String,
    mail_token: String,
    mail_from: String,
    mail_reply_to: String,
}

impl HttpMessagingService {
    pub fn from_config(config: &Config) -> Self {
        Self {
            client: Client::new(),
            sms_url: config.messaging_service_url.clone(),
            sms_token: config.messaging_service_token.clone(),
            sms_sender: config.sms_sender.clone(),
            chat_url: config.chat_service_url.clone(),
            chat_template_id: config.chat_template_id.clone(),
            mail_url: config.mail_service_url.clone(),
            mail_token: config.mail_service_token.clone(),
            mail_from: config.mail_from.clone(),
            mail_reply_to: config.mail_reply_to.clone(),
        }
    }

    async fn post<P: Serialize + Sync>(&self, channel: Channel, url: &str, token: &str, payload: &P) -> Result<(), AppError> {
        let res = self.client.post(url)
            .header("Authorization", format!("Bearer {}", token))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                let msg = format!("{:?} gateway connection error: {}", channel, e);
                error!("{}", msg);
                AppError::Notification(msg)
            })?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            let msg = format!("{:?} gateway failed. Status: {}, Body: {}", channel, status, text);
            error!("{}", msg);
            return Err(AppError::Notification(msg));
        }

        debug!("{:?} message accepted by gateway", channel);
        Ok(())
    }
}

#[derive(Serialize)]
struct SmsPayload<'a> {
    from: &'a str,
    to: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatPayload<'a> {
    template_id: &'a str,
    to: &'a str,
    text: &'a str,
}

#[derive(Serialize)]
struct EmailPayload<'a> {
    from: &'a str,
    reply_to: &'a str,
    to_addr: &'a str,
    subject: &'a str,
    html_body: &'a str,
}

#[async_trait]
impl NotificationService for HttpMessagingService {
    async fn send(&self, channel: Channel, recipient: &str, message: &OutboundMessage) -> Result<(), AppError> {
        match channel {
            Channel::Sms => {
                let payload = SmsPayload { from: &self.sms_sender, to: recipient, text: &message.body };
                self.post(channel, &self.sms_url, &self.sms_token, &payload).await
            }
            Channel::Chat => {
                let (Some(url), Some(template_id)) = (&self.chat_url, &self.chat_template_id) else {
                    return Err(AppError::Notification("Chat channel is not configured".into()));
                };
                let payload = ChatPayload { template_id, to: recipient, text: &message.body };
                self.post(channel, url, &self.sms_token, &payload).await
            }
            Channel::Email => {
                let payload = EmailPayload {
                    from: &self.mail_from,
                    reply_to: &self.mail_reply_to,
                    to_addr: recipient,
                    subject: message.subject.as_deref().unwrap_or_default(),
                    html_body: &message.body,
                };
                self.post(channel, &self.mail_url, &self.mail_token, &payload).await
            }
        }
    }
}
