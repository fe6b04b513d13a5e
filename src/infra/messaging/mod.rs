pub mod http_messaging_service;
