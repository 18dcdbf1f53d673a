mod request_id_test;
mod transcript_preview_test;
