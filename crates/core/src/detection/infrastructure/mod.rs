pub mod onnx_hand_landmarker;
pub mod onnx_palm_detector;
pub mod roi;
