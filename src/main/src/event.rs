/// Lets a `Copy + 'static` payload travel through the ESP system event loop.
///
/// The source name must be unique across the whole project and ESP IDF.
macro_rules! esp_event {
    ($event:ty, $source:literal) => {
        unsafe impl ::esp_idf_svc::eventloop::EspEventSource for $event {
            fn source() -> Option<&'static ::core::ffi::CStr> {
                Some($source)
            }
        }

        impl ::esp_idf_svc::eventloop::EspEventSerializer for $event {
            type Data<'a> = $event;

            fn serialize<F, R>(event: &Self::Data<'_>, f: F) -> R
            where
                F: FnOnce(&::esp_idf_svc::eventloop::EspEventPostData) -> R,
            {
                use ::esp_idf_svc::eventloop::{EspEventPostData, EspEventSource};

                // Payloads are Copy and 'static, post them by value
                let source = <Self as EspEventSource>::source().unwrap();
                f(&unsafe { EspEventPostData::new(source, <Self as EspEventSource>::event_id(), event) })
            }
        }

        impl ::esp_idf_svc::eventloop::EspEventDeserializer for $event {
            type Data<'a> = $event;

            fn deserialize<'a>(data: &::esp_idf_svc::eventloop::EspEvent<'a>) -> Self::Data<'a> {
                *unsafe { data.as_payload::<$event>() }
            }
        }
    };
}

pub(crate) use esp_event;
