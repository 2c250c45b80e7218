pub mod tagged_video;
