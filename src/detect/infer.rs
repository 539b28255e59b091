use ndarray::{Array2, Array4, s};
use ort::{inputs, session::Session, value::Tensor};

use crate::config::MODEL_INPUT_NAME;
use crate::error::{DrapeError, Result};

/// 运行模型推理
///
/// # 参数
/// * `model` - ONNX模型Session
/// * `input` - 输入张量，形状应为(1, 3, height, width)
///
/// # 返回值
/// 形状为(num_boxes, 5)或(num_boxes, 6)的二维数组，
/// 每行为 `[x1, y1, x2, y2, conf]`，多类别模型额外带一列 `class_id`
pub fn run_inference(model: &mut Session, input: &Array4<f32>) -> Result<Array2<f32>> {
    let shape: Vec<usize> = input.shape().to_vec();
    let (data, _offset) = input.clone().into_raw_vec_and_offset();
    let input_tensor = Tensor::from_array(([shape[0], shape[1], shape[2], shape[3]], data))?;
    let outputs = model.run(inputs![MODEL_INPUT_NAME => input_tensor])?;

    let output = outputs[0].try_extract_tensor::<f32>()?;
    let shape = output.0.clone();

    // 输出形状为 [1, num_boxes, num_params]
    if shape.len() != 3 || shape[0] != 1 || shape[2] < 5 {
        return Err(DrapeError::Inference {
            message: format!("模型输出形状不符合预期: {:?}", &shape[..]),
        });
    }

    let data = output.1.to_vec();
    let array_2d = Array2::from_shape_vec((shape[1] as usize, shape[2] as usize), data)?;

    let columns = if shape[2] >= 6 { 6 } else { 5 };
    Ok(array_2d.slice(s![.., 0..columns]).to_owned())
}
